//! Point-in-time view of an authenticated user and their images.

use serde::Serialize;

/// Most valid image entries a user directory may hold before a scan refuses it.
pub const MAX_IMAGES_PER_USER: usize = 5;

/// Ordered, bounded set of decoded image names.
///
/// Slots that are not filled simply do not exist; an empty string is a legal
/// image name (`0#`) and is kept like any other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageSet {
    names: Vec<String>,
}

/// Returned by [`ImageSet::push`] when the set is already full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSetFull(pub String);

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a name in listing order. Rejects the name once
    /// [`MAX_IMAGES_PER_USER`] entries are held.
    pub fn push(&mut self, name: String) -> Result<(), ImageSetFull> {
        if self.names.len() >= MAX_IMAGES_PER_USER {
            return Err(ImageSetFull(name));
        }
        self.names.push(name);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// An authenticated identity plus the images found for it at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    email: String,
    pub images: ImageSet,
}

impl AuthUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            images: ImageSet::new(),
        }
    }

    pub fn with_images(email: impl Into<String>, images: ImageSet) -> Self {
        Self {
            email: email.into(),
            images,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_listing_order() {
        let mut set = ImageSet::new();
        set.push("b.webp".into()).unwrap();
        set.push("a.webp".into()).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b.webp", "a.webp"]);
    }

    #[test]
    fn push_rejects_past_capacity() {
        let mut set = ImageSet::new();
        for i in 0..MAX_IMAGES_PER_USER {
            set.push(format!("{i}.webp")).unwrap();
        }
        assert_eq!(
            set.push("extra.webp".into()),
            Err(ImageSetFull("extra.webp".into()))
        );
        assert_eq!(set.len(), MAX_IMAGES_PER_USER);
    }

    #[test]
    fn empty_name_is_a_real_entry() {
        let mut set = ImageSet::new();
        set.push(String::new()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0), Some(""));
        assert_eq!(set.get(1), None);
    }

    #[test]
    fn new_user_has_no_images() {
        let user = AuthUser::new("ada@example.com");
        assert_eq!(user.email(), "ada@example.com");
        assert!(user.images.is_empty());
    }
}
