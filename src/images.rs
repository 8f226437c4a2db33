use crate::errors::ImageError;
use base64::{engine::general_purpose, Engine as _};

/// Embeds uploaded image bytes as a `data:` URL.
///
/// The declared content type wins; without one the type is guessed from the
/// file name. Anything that is not `image/*` is rejected.
pub fn read_image(
    data: &[u8],
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, ImageError> {
    if data.is_empty() {
        return Err(ImageError::Empty);
    }

    let mime = content_type
        .map(|ct| ct.trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .or_else(|| {
            file_name
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !mime.starts_with("image/") {
        tracing::debug!(%mime, ?file_name, "Rejecting non-image upload");
        return Err(ImageError::UnsupportedType(mime));
    }

    let payload = general_purpose::STANDARD.encode(data);
    tracing::debug!(%mime, bytes = data.len(), "Embedded uploaded image");
    Ok(format!("data:{};base64,{}", mime, payload))
}
