//! Storage path convention for uploaded media. Files themselves are written
//! by an external store; rows only keep these relative references.

use crate::validation::ValidationErrors;

pub const INVALID_FILE_NAME: &str = "invalid_file_name";

fn extension(file_name: &str) -> Result<&str, ValidationErrors> {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && !ext.contains('/') => Ok(ext),
        _ => Err(ValidationErrors::single(
            format!("`{file_name}` has no file extension."),
            INVALID_FILE_NAME,
        )),
    }
}

pub fn logo_path(community_id: i32, file_name: &str) -> Result<String, ValidationErrors> {
    Ok(format!(
        "storage/community/{community_id}/logo.{}",
        extension(file_name)?
    ))
}

pub fn banner_path(community_id: i32, file_name: &str) -> Result<String, ValidationErrors> {
    Ok(format!(
        "storage/community/{community_id}/banner.{}",
        extension(file_name)?
    ))
}

pub fn album_image_path(
    album_id: i32,
    image_id: i32,
    file_name: &str,
) -> Result<String, ValidationErrors> {
    Ok(format!(
        "storage/album/{album_id}/{image_id}.{}",
        extension(file_name)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_keyed_by_id() {
        assert_eq!(
            logo_path(4, "club.png").unwrap(),
            "storage/community/4/logo.png"
        );
        assert_eq!(
            banner_path(4, "wide.banner.jpg").unwrap(),
            "storage/community/4/banner.jpg"
        );
        assert_eq!(
            album_image_path(2, 17, "IMG_01.jpeg").unwrap(),
            "storage/album/2/17.jpeg"
        );
    }

    #[test]
    fn names_without_extension_are_rejected() {
        for name in ["logo", ".png", "logo.", "dir.d/logo"] {
            assert!(logo_path(1, name).unwrap_err().has_code(INVALID_FILE_NAME));
        }
    }
}
