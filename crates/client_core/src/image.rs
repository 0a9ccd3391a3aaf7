use shared::domain::ImageRef;

const DEFAULT_CDN_BASE: &str = "https://cdn.sanity.io";

/// Maps an opaque image reference to a displayable URL. Must be side-effect free.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, image: &ImageRef) -> Option<String>;
}

pub struct NoImageResolver;

impl ImageResolver for NoImageResolver {
    fn resolve(&self, _image: &ImageRef) -> Option<String> {
        None
    }
}

/// Resolves `image-<asset>-<width>x<height>-<ext>` references to CDN URLs.
#[derive(Debug, Clone)]
pub struct CdnImageResolver {
    project_id: String,
    dataset: String,
    cdn_base: String,
}

impl CdnImageResolver {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
            cdn_base: DEFAULT_CDN_BASE.to_string(),
        }
    }

    pub fn with_cdn_base(mut self, cdn_base: impl Into<String>) -> Self {
        self.cdn_base = cdn_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl ImageResolver for CdnImageResolver {
    fn resolve(&self, image: &ImageRef) -> Option<String> {
        let reference = image.as_str().trim();
        if reference.starts_with("https://") || reference.starts_with("http://") {
            return Some(reference.to_string());
        }

        let rest = reference.strip_prefix("image-")?;
        let (rest, ext) = rest.rsplit_once('-')?;
        let (asset_id, dimensions) = rest.rsplit_once('-')?;
        let (width, height) = dimensions.split_once('x')?;
        let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if asset_id.is_empty() || ext.is_empty() || !numeric(width) || !numeric(height) {
            return None;
        }

        Some(format!(
            "{}/images/{}/{}/{asset_id}-{dimensions}.{ext}",
            self.cdn_base, self.project_id, self.dataset
        ))
    }
}
