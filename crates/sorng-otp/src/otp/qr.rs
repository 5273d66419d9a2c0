//! QR hand-off for `otpauth://` URIs.
//!
//! Images are rendered by an external service; this module only produces the
//! request URL, with the OTP URI carried as a percent-encoded query value.

use crate::otp::types::*;
use crate::otp::uri;

/// Default image service endpoint.
pub const DEFAULT_QR_SERVICE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
/// Default rendered edge length in pixels.
pub const DEFAULT_QR_SIZE: u32 = 200;

/// Build the image-service URL for arbitrary text.
///
/// Existing query parameters on `service_url` are preserved.
pub fn qr_image_url(service_url: &str, text: &str, size: u32) -> Result<String, TotpError> {
    let mut url = url::Url::parse(service_url).map_err(|e| {
        TotpError::invalid_config(format!("Invalid QR service URL '{}'", service_url))
            .with_detail(e.to_string())
    })?;
    if url.cannot_be_a_base() {
        return Err(TotpError::invalid_config(format!(
            "QR service URL '{}' is not a hierarchical URL",
            service_url
        )));
    }
    url.query_pairs_mut()
        .append_pair("size", &format!("{}x{}", size, size))
        .append_pair("data", text);
    Ok(url.into())
}

/// Build the image-service URL for a descriptor's `otpauth://` URI.
pub fn descriptor_qr_url(service_url: &str, desc: &OtpDescriptor, size: u32) -> Result<String, TotpError> {
    qr_image_url(service_url, &uri::build_otpauth_uri(desc), size)
}
