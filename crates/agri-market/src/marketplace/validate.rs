use super::domain::{ImagePayload, ListingDraft};
use super::plans::MAX_LISTING_IMAGES;

/// Reference codes shorter than this are rejected before any write.
pub const MIN_REFERENCE_CODE_LEN: usize = 5;

/// Field-level failures caught before any upload or store write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listing title must not be empty")]
    EmptyTitle,
    #[error("listing description must not be empty")]
    EmptyDescription,
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("contact phone must not be empty")]
    EmptyContactPhone,
    #[error("contact email must not be empty")]
    EmptyContactEmail,
    #[error("a listing carries at most {MAX_LISTING_IMAGES} images, found {found}")]
    TooManyImages { found: usize },
    #[error("image file name must not be empty")]
    EmptyImageName,
    #[error("payment reference code must be at least {MIN_REFERENCE_CODE_LEN} characters")]
    ReferenceCodeTooShort,
}

/// Validate seller-supplied listing fields. Price zero is allowed (the
/// negotiable flag covers "price on request" listings).
pub fn validate_draft(draft: &ListingDraft) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if draft.description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    if draft.quantity == 0 {
        return Err(ValidationError::ZeroQuantity);
    }
    if draft.contact_phone.trim().is_empty() {
        return Err(ValidationError::EmptyContactPhone);
    }
    if draft.contact_email.trim().is_empty() {
        return Err(ValidationError::EmptyContactEmail);
    }
    Ok(())
}

/// Enforce the image-count invariant before any upload call.
pub fn validate_image_total(total: usize) -> Result<(), ValidationError> {
    if total > MAX_LISTING_IMAGES {
        return Err(ValidationError::TooManyImages { found: total });
    }
    Ok(())
}

pub fn validate_image_payload(payload: &ImagePayload) -> Result<(), ValidationError> {
    if payload.file_name.trim().is_empty() {
        return Err(ValidationError::EmptyImageName);
    }
    Ok(())
}

/// Trim and length-check a payment reference code.
pub fn validate_reference_code(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_REFERENCE_CODE_LEN {
        return Err(ValidationError::ReferenceCodeTooShort);
    }
    Ok(trimmed.to_string())
}
