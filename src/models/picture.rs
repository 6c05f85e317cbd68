use sqlx::FromRow;
use uuid::Uuid;

pub const SIZE_MAX: i64 = 16_000_000;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Picture {
    pub id: Uuid,
    pub filename: Option<String>,
    pub content: Vec<u8>,
    pub content_type: String,
    pub size: i64,
    pub user: Uuid,
}

impl Picture {
    pub fn is_image_type(content_type: &str) -> bool {
        content_type
            .strip_prefix("image/")
            .map(|subtype| !subtype.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_image_mime_types() {
        assert!(Picture::is_image_type("image/jpeg"));
        assert!(Picture::is_image_type("image/png"));
        assert!(!Picture::is_image_type("image/"));
        assert!(!Picture::is_image_type("text/plain"));
        assert!(!Picture::is_image_type("application/octet-stream"));
    }
}
