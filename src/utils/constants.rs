//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 10;

// Broker home: ~/.token-broker/{config.yaml,cache.json}
pub const BROKER_HOME_DIR: &str = ".token-broker";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const CACHE_FILE_NAME: &str = "cache.json";

// Remote endpoints
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_STS_URL: &str = "https://sts.googleapis.com/v1/token";
pub const DEFAULT_TOKEN_INFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo/?access_token=";

// Delegate commands
pub const DEFAULT_SSO_CLI: &str = "sso";
pub const DEFAULT_CURL_CLI: &str = "curl";

// OAuth2 grants
pub const GRANT_TYPE_JWT_BEARER: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";
pub const GRANT_TYPE_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
pub const TOKEN_TYPE_ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
pub const JWT_LIFETIME_SECS: i64 = 3600;

// Supported credential types
pub const CREDENTIALS_SERVICE_ACCOUNT: &str = "service_account";
pub const CREDENTIALS_AUTHORIZED_USER: &str = "authorized_user";
