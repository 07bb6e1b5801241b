use url::Url;

use crate::error::{CloudError, CloudResult};

/// URLs of the service routes, derived from one base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// `base` is the service root, e.g. `http://localhost:3000/api`.
    pub fn new(base: &str) -> CloudResult<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(CloudError::Config {
                message: format!("'{}' cannot be used as a service root", base),
            });
        }
        Ok(Self { base })
    }

    pub fn login(&self) -> String {
        self.route(&["auth", "login"])
    }

    pub fn register(&self) -> String {
        self.route(&["auth", "register"])
    }

    pub fn settings(&self) -> String {
        self.route(&["settings"])
    }

    pub fn assets(&self) -> String {
        self.route(&["assets"])
    }

    pub fn inventory(&self) -> String {
        self.route(&["assets", "inventory"])
    }

    /// The download route for `filename`, escaped as a single segment.
    pub fn asset(&self, filename: &str) -> String {
        self.route(&["assets", filename])
    }

    fn route(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_hang_off_the_base() {
        let endpoints = Endpoints::new("http://localhost:3000/api").unwrap();
        assert_eq!(endpoints.login(), "http://localhost:3000/api/auth/login");
        assert_eq!(endpoints.register(), "http://localhost:3000/api/auth/register");
        assert_eq!(endpoints.settings(), "http://localhost:3000/api/settings");
        assert_eq!(endpoints.assets(), "http://localhost:3000/api/assets");
        assert_eq!(
            endpoints.inventory(),
            "http://localhost:3000/api/assets/inventory"
        );
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let endpoints = Endpoints::new("http://localhost:3000/api/").unwrap();
        assert_eq!(endpoints.settings(), "http://localhost:3000/api/settings");
    }

    #[test]
    fn filenames_are_one_escaped_segment() {
        let endpoints = Endpoints::new("http://localhost:3000/api").unwrap();
        assert_eq!(
            endpoints.asset("assets/game/my skin.png"),
            "http://localhost:3000/api/assets/assets%2Fgame%2Fmy%20skin.png"
        );
    }

    #[test]
    fn rejects_bad_bases() {
        assert!(matches!(Endpoints::new("not a url"), Err(CloudError::Url(_))));
        assert!(matches!(
            Endpoints::new("mailto:someone@example.com"),
            Err(CloudError::Config { .. })
        ));
    }
}
