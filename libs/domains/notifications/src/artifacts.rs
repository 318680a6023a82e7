//! Scannable images embedded into mails.

use crate::error::{NotificationError, NotificationResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

/// Turns an identifier into a base64-encoded image suitable for a data URI.
pub trait ArtifactGenerator: Send + Sync {
    /// MIME type of the encoded image.
    fn mime_type(&self) -> &'static str;

    fn generate(&self, id: &str) -> NotificationResult<String>;
}

/// SVG QR codes with high error correction.
#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    size: u32,
}

impl QrCodeGenerator {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Default for QrCodeGenerator {
    fn default() -> Self {
        Self::new(400)
    }
}

impl ArtifactGenerator for QrCodeGenerator {
    fn mime_type(&self) -> &'static str {
        "image/svg+xml"
    }

    fn generate(&self, id: &str) -> NotificationResult<String> {
        let code = QrCode::with_error_correction_level(id.as_bytes(), EcLevel::H)
            .map_err(|e| NotificationError::ArtifactError(format!("QR encoding of '{id}' failed: {e}")))?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(self.size, self.size)
            .build();
        Ok(STANDARD.encode(image))
    }
}
