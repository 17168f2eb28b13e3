use crate::contract::model::{FruitDraft, NewUser, Role};
use crate::domain::error::DomainError;

pub const MAX_FRUIT_NAME_LEN: usize = 100;
pub const MAX_USERNAME_LEN: usize = 64;

pub fn validate_fruit(draft: &FruitDraft) -> Result<(), DomainError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    let len = name.chars().count();
    if len > MAX_FRUIT_NAME_LEN {
        return Err(DomainError::validation(
            "name",
            format!("too long: {len} characters (max: {MAX_FRUIT_NAME_LEN})"),
        ));
    }
    if draft.quantity < 0 {
        return Err(DomainError::validation("quantity", "must be >= 0"));
    }
    if !draft.price.is_finite() || draft.price < 0.0 {
        return Err(DomainError::validation(
            "price",
            "must be a finite number >= 0",
        ));
    }
    Ok(())
}

/// Check a creation request and resolve its role.
pub fn validate_new_user(new_user: &NewUser) -> Result<Role, DomainError> {
    let username = new_user.username.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username", "must not be empty"));
    }
    let len = username.chars().count();
    if len > MAX_USERNAME_LEN {
        return Err(DomainError::validation(
            "username",
            format!("too long: {len} characters (max: {MAX_USERNAME_LEN})"),
        ));
    }
    if new_user.password.is_empty() {
        return Err(DomainError::validation("password", "must not be empty"));
    }
    new_user
        .role
        .parse::<Role>()
        .map_err(|e| DomainError::validation("role", format!("{e}; expected 'admin' or 'user'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, quantity: i32, price: f64) -> FruitDraft {
        FruitDraft {
            name: name.to_string(),
            quantity,
            price,
        }
    }

    fn field_of(err: DomainError) -> String {
        match err {
            DomainError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_reasonable_fruit() {
        assert!(validate_fruit(&draft("Apple", 10, 1.25)).is_ok());
        assert!(validate_fruit(&draft("Free sample", 0, 0.0)).is_ok());
    }

    #[test]
    fn rejects_bad_fruit_fields() {
        assert_eq!(field_of(validate_fruit(&draft("  ", 1, 1.0)).unwrap_err()), "name");
        assert_eq!(
            field_of(validate_fruit(&draft(&"x".repeat(101), 1, 1.0)).unwrap_err()),
            "name"
        );
        assert_eq!(field_of(validate_fruit(&draft("Kiwi", -1, 1.0)).unwrap_err()), "quantity");
        assert_eq!(field_of(validate_fruit(&draft("Kiwi", 1, -0.5)).unwrap_err()), "price");
        assert_eq!(
            field_of(validate_fruit(&draft("Kiwi", 1, f64::NAN)).unwrap_err()),
            "price"
        );
    }

    #[test]
    fn new_user_rules() {
        let ok = NewUser {
            username: "alice".into(),
            password: "pw".into(),
            role: "user".into(),
        };
        assert_eq!(validate_new_user(&ok).unwrap(), Role::User);

        let bad_role = NewUser {
            role: "root".into(),
            ..ok.clone()
        };
        assert_eq!(field_of(validate_new_user(&bad_role).unwrap_err()), "role");

        let no_password = NewUser {
            password: String::new(),
            ..ok.clone()
        };
        assert_eq!(field_of(validate_new_user(&no_password).unwrap_err()), "password");

        let long_name = NewUser {
            username: "u".repeat(65),
            ..ok
        };
        assert_eq!(field_of(validate_new_user(&long_name).unwrap_err()), "username");
    }
}
