//! Task names are the only identifiers that stay stable across compilations,
//! so they are built here and nowhere else.

use crate::config::{Configuration, PartialUpdate};

const CANDIDATES: &str = "beetmover_candidates";
const UPDATE_GENERATOR: &str = "update_generator";

#[derive(Debug, Clone, Copy)]
pub struct Namer<'a> {
    branch: &'a str,
    product: &'a str,
}

impl<'a> Namer<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            branch: &config.branch,
            product: &config.product,
        }
    }

    /// `release-<branch>_<product>_<suffix>`
    pub fn release(&self, suffix: &str) -> String {
        format!("release-{}_{}_{}", self.branch, self.product, suffix)
    }

    /// `release-<branch>_<product>_<platform>_<suffix>`
    pub fn platform(&self, platform: &str, suffix: &str) -> String {
        self.release(&format!("{platform}_{suffix}"))
    }

    /// `release-<branch>_<product>_<platform>_partial_en-US_<v>build<n>_<suffix>`
    pub fn partial(&self, platform: &str, partial: &PartialUpdate, suffix: &str) -> String {
        self.platform(platform, &format!("partial_en-US_{partial}_{suffix}"))
    }

    /// `release-<branch>_<product>_<platform>_l10n_repack_<suffix>_<chunk>`, the
    /// suffix is dropped when empty.
    pub fn l10n(&self, platform: &str, suffix: &str, chunk: u32) -> String {
        if suffix.is_empty() {
            self.platform(platform, &format!("l10n_repack_{chunk}"))
        } else {
            self.platform(platform, &format!("l10n_repack_{suffix}_{chunk}"))
        }
    }

    /// `release-<branch>_<product>_<platform>_l10n_repack_partial_<v>build<n>_<suffix>_<chunk>`
    pub fn l10n_partial(
        &self,
        platform: &str,
        partial: &PartialUpdate,
        suffix: &str,
        chunk: u32,
    ) -> String {
        self.platform(
            platform,
            &format!("l10n_repack_partial_{partial}_{suffix}_{chunk}"),
        )
    }

    pub fn l10n_repack(&self, platform: &str, chunk: u32) -> String {
        self.l10n(platform, "", chunk)
    }

    pub fn en_us_partial_generator(&self, platform: &str, partial: &PartialUpdate) -> String {
        self.partial(platform, partial, UPDATE_GENERATOR)
    }

    pub fn l10n_partial_generator(
        &self,
        platform: &str,
        partial: &PartialUpdate,
        chunk: u32,
    ) -> String {
        self.l10n_partial(platform, partial, UPDATE_GENERATOR, chunk)
    }

    /// The checksums task keeps its historic spelling.
    pub fn checksums(&self) -> String {
        format!("release-{}-{}_chcksms", self.branch, self.product)
    }

    pub fn en_us_complete_candidates(&self, platform: &str) -> String {
        self.platform(platform, &format!("complete_en-US_{CANDIDATES}"))
    }

    pub fn en_us_partial_candidates(&self, platform: &str, partial: &PartialUpdate) -> String {
        self.partial(platform, partial, CANDIDATES)
    }

    pub fn l10n_complete_candidates(&self, platform: &str, chunk: u32) -> String {
        self.l10n(platform, CANDIDATES, chunk)
    }

    pub fn l10n_partial_candidates(
        &self,
        platform: &str,
        partial: &PartialUpdate,
        chunk: u32,
    ) -> String {
        self.l10n_partial(platform, partial, CANDIDATES, chunk)
    }

    pub fn push_to_releases(&self) -> String {
        self.release("push_to_releases")
    }

    pub fn push_to_releases_gate(&self) -> String {
        self.release("push_to_releases_human_decision")
    }

    pub fn partner_repack(&self, platform: &str) -> String {
        self.platform(platform, "partner_repack")
    }

    pub fn final_verify(&self, platform: &str, channel: &str) -> String {
        self.platform(platform, &format!("final_verify_{channel}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::beta;

    #[test]
    fn test_candidate_names() {
        let config = beta();
        let namer = Namer::new(&config);
        let partial = PartialUpdate::new("38.0", 1);

        assert_eq!(
            namer.en_us_complete_candidates("win32"),
            "release-mozilla-beta_firefox_win32_complete_en-US_beetmover_candidates"
        );
        assert_eq!(
            namer.en_us_partial_candidates("macosx64", &partial),
            "release-mozilla-beta_firefox_macosx64_partial_en-US_38.0build1_beetmover_candidates"
        );
        assert_eq!(
            namer.l10n_complete_candidates("win32", 1),
            "release-mozilla-beta_firefox_win32_l10n_repack_beetmover_candidates_1"
        );
        assert_eq!(
            namer.l10n_partial_candidates("win32", &partial, 1),
            "release-mozilla-beta_firefox_win32_l10n_repack_partial_38.0build1_beetmover_candidates_1"
        );
    }

    #[test]
    fn test_release_names() {
        let config = beta();
        let namer = Namer::new(&config);

        assert_eq!(namer.checksums(), "release-mozilla-beta-firefox_chcksms");
        assert_eq!(
            namer.push_to_releases(),
            "release-mozilla-beta_firefox_push_to_releases"
        );
        assert_eq!(
            namer.push_to_releases_gate(),
            "release-mozilla-beta_firefox_push_to_releases_human_decision"
        );
        assert_eq!(
            namer.l10n_repack("macosx64", 2),
            "release-mozilla-beta_firefox_macosx64_l10n_repack_2"
        );
    }
}
