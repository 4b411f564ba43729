//! GDMF certificate policy (§4.2, §6): GDMF is the one source that pins
//! Apple's own root certificate rather than trusting the system store, unless
//! the operator explicitly opts into insecure mode or the pinned root is
//! missing from disk.

use crate::config::{GdmfConfig, HttpConfig};

/// Build the `reqwest::Client` GDMF requests should go through: pinned root if
/// `config/AppleRoot.pem` is present and `insecure` is not set, the system
/// default trust store with a loud warning if the pin is missing or disabled.
pub fn gdmf_client(http: &HttpConfig, gdmf: &GdmfConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .user_agent(&http.user_agent)
        .timeout(std::time::Duration::from_secs(http.timeout_secs));

    if gdmf.insecure {
        tracing::warn!("GDMF insecure mode is enabled; certificate pinning is disabled");
        builder = builder.danger_accept_invalid_certs(true);
        return builder.build().expect("reqwest client config is static and known-valid");
    }

    let pem_path = crate::paths::apple_root_pem_path();
    match std::fs::read(&pem_path) {
        Ok(bytes) => match reqwest::Certificate::from_pem(&bytes) {
            Ok(cert) => builder
                .add_root_certificate(cert)
                .tls_built_in_root_certs(false)
                .build()
                .expect("reqwest client config is static and known-valid"),
            Err(e) => {
                tracing::warn!(error = %e, path = %pem_path.display(), "failed to parse Apple root certificate; falling back to system trust store");
                builder.build().expect("reqwest client config is static and known-valid")
            }
        },
        Err(_) => {
            tracing::warn!(
                path = %pem_path.display(),
                "Apple root certificate not found; GDMF requests will use the system trust store"
            );
            builder.build().expect("reqwest client config is static and known-valid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unsafe_code)]
    fn missing_pem_falls_back_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: test-local override, no other test in this binary reads SOFA_CACHE_DIR
        // concurrently with this one (see orchestrator tests for the same pattern).
        unsafe {
            std::env::set_var("SOFA_CACHE_DIR", dir.path());
        }
        let _client = gdmf_client(&HttpConfig::default(), &GdmfConfig::default());
        unsafe {
            std::env::remove_var("SOFA_CACHE_DIR");
        }
    }

    #[test]
    fn insecure_flag_skips_pin_lookup_entirely() {
        let gdmf = GdmfConfig { insecure: true, ..GdmfConfig::default() };
        let _client = gdmf_client(&HttpConfig::default(), &gdmf);
    }
}
