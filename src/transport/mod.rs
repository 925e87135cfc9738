pub mod credentials;
pub mod session;

pub use credentials::{CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
pub use session::{is_html, parse_url, AuthSession, RedirectAuthPolicy};
