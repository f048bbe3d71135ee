use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header,
    TokenData, Validation,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default algorithm used for JWT token signing.
const DEFAULT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Length of the JWT secret in bytes.
pub const JWT_SECRET_LENGTH: usize = 32;

/// How long a generated token is handed out for before a fresh one is minted.
///
/// Engines reject an `iat` more than `IAT_TOLERANCE` away from their clock, so this must stay
/// comfortably below it.
pub const TOKEN_VALIDITY: Duration = Duration::from_secs(30);

/// The maximum clock drift tolerated between the `iat` claim and the verifier's clock.
pub const IAT_TOLERANCE: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub enum Error {
    FromHexError(hex::FromHexError),
    JWTError(jsonwebtoken::errors::Error),
    InvalidKey(String),
    InvalidToken,
    /// The token source produced a token that had already expired.
    StaleToken { valid_until: Duration, now: Duration },
    /// The token source was unable to produce a token.
    TokenSource(String),
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::FromHexError(e)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Error::JWTError(e)
    }
}

/// The secret shared between this node and its execution engine.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtKey([u8; JWT_SECRET_LENGTH]);

impl JwtKey {
    /// Wrap given slice in `Self`. Returns an error if slice.len() != `JWT_SECRET_LENGTH`.
    pub fn from_slice(key: &[u8]) -> Result<Self, String> {
        if key.len() != JWT_SECRET_LENGTH {
            return Err(format!(
                "Invalid key length. Expected {} got {}",
                JWT_SECRET_LENGTH,
                key.len()
            ));
        }
        let mut res = [0; JWT_SECRET_LENGTH];
        res.copy_from_slice(key);
        Ok(Self(res))
    }

    /// Parses a hex secret, with or without a `0x` prefix.
    pub fn from_hex(hex_key: &str) -> Result<Self, Error> {
        let trimmed = hex_key.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped)?;
        Self::from_slice(&bytes).map_err(Error::InvalidKey)
    }

    /// Reads a hex secret from `path`.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidKey(format!(
                "Unable to read JWT secret at {}: {:?}",
                path.display(),
                e
            ))
        })?;
        Self::from_hex(&contents)
    }

    /// Returns a reference to the underlying byte array.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the key and returns the underlying byte array.
    pub fn into_bytes(self) -> [u8; JWT_SECRET_LENGTH] {
        self.0
    }

    /// Returns the hex encoded `String` for the secret.
    pub fn hex_string(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtKey(..)")
    }
}

/// Claims struct as defined in https://github.com/ethereum/execution-apis/blob/main/src/engine/authentication.md#jwt-claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// issued-at claim. Represented as seconds passed since UNIX_EPOCH.
    pub iat: u64,
    /// Optional unique identifier for the CL node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Optional client version for the CL node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clv: Option<String>,
}

/// A bearer token together with the instant (since `UNIX_EPOCH`) it stops being usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub valid_until: Duration,
}

impl Token {
    pub fn new(value: String, valid_until: Duration) -> Self {
        Self { value, valid_until }
    }

    /// A token is usable strictly before `valid_until`.
    pub fn is_available_at(&self, now: Duration) -> bool {
        now < self.valid_until
    }
}

/// A source of bearer tokens for engine requests.
///
/// `Ok(None)` means requests go out unauthenticated.
pub trait TokenProvider: Send + Sync {
    fn token(&self, now: Duration) -> Result<Option<Token>, Error>;
}

/// Provides a token source for engines that do not require authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuth;

impl TokenProvider for NoAuth {
    fn token(&self, _now: Duration) -> Result<Option<Token>, Error> {
        Ok(None)
    }
}

/// Mints HS256 JWTs for the engine API.
pub struct Auth {
    key: EncodingKey,
    id: Option<String>,
    clv: Option<String>,
}

impl Auth {
    pub fn new(secret: JwtKey, id: Option<String>, clv: Option<String>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            id,
            clv,
        }
    }

    /// Create a new `Auth` struct given the path to the file containing the hex
    /// encoded jwt key.
    pub fn new_with_path(
        jwt_path: &Path,
        id: Option<String>,
        clv: Option<String>,
    ) -> Result<Self, Error> {
        JwtKey::from_file(jwt_path).map(|key| Self::new(key, id, clv))
    }

    /// Generate a JWT token with `claims.iat` set to current time.
    pub fn generate_token(&self) -> Result<String, Error> {
        let claims = self.generate_claims_at_timestamp(get_current_timestamp());
        self.generate_token_with_claims(&claims)
    }

    /// Generate a JWT token with the given claims.
    fn generate_token_with_claims(&self, claims: &Claims) -> Result<String, Error> {
        let header = Header::new(DEFAULT_ALGORITHM);
        Ok(encode(&header, claims, &self.key)?)
    }

    /// Generate a `Claims` struct issued at `iat`.
    fn generate_claims_at_timestamp(&self, iat: u64) -> Claims {
        Claims {
            iat,
            id: self.id.clone(),
            clv: self.clv.clone(),
        }
    }
}

impl TokenProvider for Auth {
    fn token(&self, now: Duration) -> Result<Option<Token>, Error> {
        let claims = self.generate_claims_at_timestamp(now.as_secs());
        let value = self.generate_token_with_claims(&claims)?;
        let valid_until = Duration::from_secs(now.as_secs()).saturating_add(TOKEN_VALIDITY);
        Ok(Some(Token::new(value, valid_until)))
    }
}

/// Validate a JWT token given the secret key and return the originally signed `TokenData`.
///
/// The `iat` claim must be within `IAT_TOLERANCE` of the current time.
pub fn validate_token(token: &str, secret: &JwtKey) -> Result<TokenData<Claims>, Error> {
    let mut validation = Validation::new(DEFAULT_ALGORITHM);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    let now = get_current_timestamp();
    if token_data.claims.iat.abs_diff(now) > IAT_TOLERANCE.as_secs() {
        return Err(Error::InvalidToken);
    }

    Ok(token_data)
}

/// Caches the token of an inner `TokenProvider`, refreshing it once it stops being available.
///
/// The check and the refresh happen under one lock, so concurrent callers that observe a stale
/// token cause exactly one call to the inner provider.
pub struct CachedTokenProvider<P> {
    source: P,
    cached: Mutex<Option<Token>>,
}

impl<P: TokenProvider> CachedTokenProvider<P> {
    pub fn new(source: P) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }
}

impl<P: TokenProvider> TokenProvider for CachedTokenProvider<P> {
    fn token(&self, now: Duration) -> Result<Option<Token>, Error> {
        let mut cached = self.cached.lock();

        if let Some(token) = cached.as_ref().filter(|token| token.is_available_at(now)) {
            return Ok(Some(token.clone()));
        }

        // On error the stale entry is kept, it will be replaced by the next successful refresh.
        let fresh = self.source.token(now)?;

        if let Some(token) = fresh.as_ref().filter(|token| !token.is_available_at(now)) {
            return Err(Error::StaleToken {
                valid_until: token.valid_until,
                now,
            });
        }

        *cached = fresh.clone();
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    const HEX_SECRET: &str = "7365637265742d6b65792d666f722d656e67696e652d617069732d2d2d2d2d2d";

    /// Hands out its tokens in order, counting how often it was asked.
    struct SequenceProvider {
        tokens: Vec<Token>,
        calls: AtomicUsize,
    }

    impl SequenceProvider {
        fn new(tokens: Vec<Token>) -> Self {
            Self {
                tokens,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TokenProvider for SequenceProvider {
        fn token(&self, _now: Duration) -> Result<Option<Token>, Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            // Simulate slow I/O so concurrent callers overlap.
            std::thread::sleep(Duration::from_millis(20));
            Ok(self.tokens.get(call).cloned())
        }
    }

    struct FailingProvider;

    impl TokenProvider for FailingProvider {
        fn token(&self, _now: Duration) -> Result<Option<Token>, Error> {
            Err(Error::TokenSource("secret unavailable".to_string()))
        }
    }

    fn token_a() -> Token {
        Token::new("a".to_string(), Duration::from_secs(100))
    }

    fn token_b() -> Token {
        Token::new("b".to_string(), Duration::from_secs(200))
    }

    #[test]
    fn jwt_key_from_hex() {
        let key = JwtKey::from_hex(HEX_SECRET).unwrap();
        assert_eq!(key.hex_string(), HEX_SECRET);
        assert_eq!(JwtKey::from_hex(&format!("0x{}\n", HEX_SECRET)).unwrap(), key);
        assert!(matches!(
            JwtKey::from_hex("0x1234"),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(JwtKey::from_hex("zz"), Err(Error::FromHexError(_))));
    }

    #[test]
    fn jwt_key_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwt.hex");
        std::fs::write(&path, format!("0x{}", HEX_SECRET)).unwrap();

        let auth = Auth::new_with_path(&path, Some("node".to_string()), None).unwrap();
        let token = auth.generate_token().unwrap();
        let data = validate_token(&token, &JwtKey::from_hex(HEX_SECRET).unwrap()).unwrap();
        assert_eq!(data.claims.id.as_deref(), Some("node"));
        assert_eq!(data.claims.clv, None);

        assert!(Auth::new_with_path(&dir.path().join("missing"), None, None).is_err());
    }

    #[test]
    fn token_rejected_with_wrong_key() {
        let auth = Auth::new(JwtKey::from_hex(HEX_SECRET).unwrap(), None, None);
        let token = auth.generate_token().unwrap();
        let other = JwtKey::from_slice(&[1; JWT_SECRET_LENGTH]).unwrap();
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn auth_token_validity_window() {
        let auth = Auth::new(JwtKey::from_hex(HEX_SECRET).unwrap(), None, None);
        let now = Duration::from_secs(1_000);
        let token = auth.token(now).unwrap().unwrap();

        assert_eq!(token.valid_until, now + TOKEN_VALIDITY);
        assert!(token.is_available_at(now));
        assert!(!token.is_available_at(now + TOKEN_VALIDITY));
    }

    #[test]
    fn cache_serves_token_until_expiry() {
        let cache = CachedTokenProvider::new(SequenceProvider::new(vec![token_a(), token_b()]));

        assert_eq!(cache.token(Duration::from_secs(50)).unwrap(), Some(token_a()));
        assert_eq!(cache.token(Duration::from_secs(99)).unwrap(), Some(token_a()));
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.token(Duration::from_secs(150)).unwrap(), Some(token_b()));
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_callers_share_one_refresh() {
        let cache = Arc::new(CachedTokenProvider::new(SequenceProvider::new(vec![
            token_a(),
            token_b(),
        ])));
        let barrier = Arc::new(Barrier::new(2));

        let handles = (0..2)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    cache.token(Duration::from_secs(50)).unwrap()
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(token_a()));
        }
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.token(Duration::from_secs(150)).unwrap(), Some(token_b()));
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_source_is_queried_again() {
        let cache = CachedTokenProvider::new(SequenceProvider::new(vec![]));

        assert_eq!(cache.token(Duration::from_secs(1)).unwrap(), None);
        assert_eq!(cache.token(Duration::from_secs(2)).unwrap(), None);
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn expired_token_from_source_is_rejected() {
        let cache = CachedTokenProvider::new(SequenceProvider::new(vec![token_a()]));

        assert!(matches!(
            cache.token(Duration::from_secs(100)),
            Err(Error::StaleToken { .. })
        ));
        assert_eq!(*cache.cached.lock(), None);
    }

    #[test]
    fn source_failure_propagates_and_releases_lock() {
        let cache = CachedTokenProvider::new(FailingProvider);

        assert!(matches!(
            cache.token(Duration::from_secs(1)),
            Err(Error::TokenSource(_))
        ));
        // A second call must not deadlock.
        assert!(cache.token(Duration::from_secs(2)).is_err());
    }
}
