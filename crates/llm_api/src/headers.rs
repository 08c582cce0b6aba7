use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{AuthStyle, EngineConfig};
use crate::error::EngineError;

pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Deterministic header set for one request.
pub fn build_headers(config: &EngineConfig) -> Result<BTreeMap<String, String>, EngineError> {
    let credential = config.credential.trim();
    if credential.is_empty() {
        return Err(EngineError::MissingCredential);
    }

    let mut headers = BTreeMap::new();
    match &config.auth {
        AuthStyle::ApiKeyHeader(name) => {
            headers.insert(name.trim().to_ascii_lowercase(), credential.to_owned());
        }
        AuthStyle::Bearer => {
            headers.insert(
                HEADER_AUTHORIZATION.to_owned(),
                format!("Bearer {credential}"),
            );
        }
    }
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    let user_agent = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(default_user_agent, str::to_owned);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

pub fn to_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, EngineError> {
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| EngineError::InvalidHeader(key.clone()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| EngineError::InvalidHeader(key.clone()))?;
        out.insert(name, value);
    }
    Ok(out)
}

pub fn default_user_agent() -> String {
    match runtime_os_triplet() {
        Some((platform, release, arch)) => format!("yosh ({platform} {release}; {arch})"),
        None => "yosh".to_owned(),
    }
}

fn normalize_arch(arch: &str) -> String {
    match arch.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" => "x64".to_owned(),
        "x86" | "i386" | "i686" => "ia32".to_owned(),
        "aarch64" => "arm64".to_owned(),
        normalized => normalized.to_owned(),
    }
}

fn runtime_os_triplet() -> Option<(String, String, String)> {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;

    let mut raw = MaybeUninit::<libc::utsname>::uninit();
    // SAFETY: `uname` initializes the provided `utsname` struct on success.
    if unsafe { libc::uname(raw.as_mut_ptr()) } != 0 {
        return None;
    }
    // SAFETY: `uname` returned success, so `raw` is initialized.
    let raw = unsafe { raw.assume_init() };
    // SAFETY: `uname` provides NUL-terminated fixed-size C strings.
    let (platform, release, arch) = unsafe {
        (
            CStr::from_ptr(raw.sysname.as_ptr()).to_string_lossy().to_lowercase(),
            CStr::from_ptr(raw.release.as_ptr()).to_string_lossy().into_owned(),
            CStr::from_ptr(raw.machine.as_ptr()).to_string_lossy().into_owned(),
        )
    };
    let arch = normalize_arch(&arch);

    if platform.is_empty() || release.is_empty() || arch.is_empty() {
        None
    } else {
        Some((platform, release, arch))
    }
}
