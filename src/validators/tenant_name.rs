use super::ValidationError;

pub fn validate_tenant_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::TenantNameEmpty);
    }

    if trimmed.len() > 255 {
        return Err(ValidationError::TenantNameTooLong);
    }

    Ok(())
}
