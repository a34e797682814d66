//! File and material naming conventions.
//!
//! - Baked image: `<sanitized material, -ORG stripped> <pass>.png`
//! - Retained original: `<name>-ORG`
//! - Atlas material and texture group: `<name> Atlas`
//! - Atlas image: `<sanitized object, "001" removed>_<pass>.png`

use std::path::{Path, PathBuf};

use matbake_scene::PassType;

/// Suffix marking a retained original material.
pub const ORG_SUFFIX: &str = "-ORG";

/// Characters removed from names before they become file names.
const ILLEGAL_CHARS: [char; 11] = ['\\', '`', '*', '<', '>', '.', ':', '?', '|', '/', '"'];

/// Strips characters illegal in common file systems.
pub fn sanitize_name(name: &str) -> String {
    name.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect()
}

/// Removes one trailing `-ORG`.
pub fn strip_org(name: &str) -> &str {
    name.strip_suffix(ORG_SUFFIX).unwrap_or(name)
}

pub fn is_org(name: &str) -> bool {
    name.ends_with(ORG_SUFFIX)
}

/// `name` with `-ORG` appended, unless it already ends with it.
pub fn org_name(name: &str) -> String {
    if is_org(name) {
        name.to_string()
    } else {
        format!("{}{}", name, ORG_SUFFIX)
    }
}

/// Stem shared by a material's baked files.
pub fn bake_stem(material_name: &str) -> String {
    let sanitized = sanitize_name(material_name);
    strip_org(&sanitized).to_string()
}

/// File name of a material's baked pass.
pub fn bake_file_name(material_name: &str, pass: PassType) -> String {
    format!("{} {}.png", bake_stem(material_name), pass)
}

pub fn bake_file_path(dir: &Path, material_name: &str, pass: PassType) -> PathBuf {
    dir.join(bake_file_name(material_name, pass))
}

/// Name of the atlas material (and its texture group) for a simplified
/// material.
pub fn atlas_material_name(material_name: &str) -> String {
    format!("{} Atlas", material_name)
}

/// Stable atlas image name for a mesh in the duplicated collection. The
/// duplicate carries a `.001` counter that sanitizing turns into `001`,
/// which is removed again.
pub fn atlas_image_name(object_name: &str, pass: PassType) -> String {
    format!("{}_{}.png", sanitize_name(object_name).replace("001", ""), pass)
}

/// Name the texture packer gives the image for mesh `index`.
pub fn packed_image_name(index: usize, pass: PassType) -> String {
    format!("{}_{}.png", index, pass)
}

pub fn atlas_collection_name(model_name: &str) -> String {
    format!("{} atlas", model_name)
}

/// Interchange export file for the model or its atlas duplicate.
pub fn export_file_name(model_name: &str, atlas: bool) -> String {
    let suffix = if atlas { " atlas" } else { "" };
    format!("{} exported model{}.fbx", sanitize_name(model_name), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Hair: front/back?"), "Hair frontback");
        assert_eq!(sanitize_name(r#"a\b`c*d<e>f.g:h?i|j/k"l"#), "abcdefghijkl");
        assert_eq!(sanitize_name("Skin"), "Skin");
    }

    #[test]
    fn test_org_suffix() {
        assert_eq!(strip_org("Skin-ORG"), "Skin");
        assert_eq!(strip_org("Skin-ORG-ORG"), "Skin-ORG");
        assert_eq!(org_name("Skin"), "Skin-ORG");
        assert_eq!(org_name("Skin-ORG"), "Skin-ORG");
    }

    #[test]
    fn test_bake_file_name() {
        assert_eq!(bake_file_name("MatA", PassType::Light), "MatA light.png");
        assert_eq!(bake_file_name("Skin.001-ORG", PassType::Dark), "Skin001 dark.png");
        assert_eq!(
            bake_file_path(Path::new("/m/baked_files"), "Eyes", PassType::Normal),
            PathBuf::from("/m/baked_files/Eyes normal.png")
        );
    }

    #[test]
    fn test_atlas_names() {
        assert_eq!(atlas_image_name("Body.001", PassType::Light), "Body_light.png");
        assert_eq!(atlas_image_name("Shirt", PassType::Dark), "Shirt_dark.png");
        assert_eq!(packed_image_name(3, PassType::Normal), "3_normal.png");
        assert_eq!(atlas_material_name("Skin"), "Skin Atlas");
        assert_eq!(atlas_collection_name("Rin"), "Rin atlas");
        assert_eq!(export_file_name("Rin.v2", true), "Rinv2 exported model atlas.fbx");
        assert_eq!(export_file_name("Rin", false), "Rin exported model.fbx");
    }

    proptest! {
        #[test]
        fn prop_sanitized_names_have_no_illegal_chars(name in ".{0,40}") {
            let sanitized = sanitize_name(&name);
            prop_assert!(!sanitized.chars().any(|c| ILLEGAL_CHARS.contains(&c)));
            prop_assert_eq!(sanitize_name(&sanitized), sanitized.clone());
        }

        #[test]
        fn prop_org_name_is_idempotent(name in "[A-Za-z ]{1,20}") {
            let once = org_name(&name);
            prop_assert_eq!(org_name(&once), once.clone());
            prop_assert_eq!(strip_org(&once), name.as_str());
        }
    }
}
