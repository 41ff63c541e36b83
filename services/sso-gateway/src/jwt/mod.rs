//! Token production: signing algorithms, the JWT tokenizer and JWE nesting.

pub mod algorithm;
pub mod jwe;
pub mod tokenizer;

pub use algorithm::{ContentEncryption, KeyManagement, SigningAlgorithm};
pub use jwe::{decrypt_compact, encrypt_compact};
pub use tokenizer::{JwtTokenizer, Tokenizer};
