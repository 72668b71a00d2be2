//! Load `.credsink.toml` from the input directory (CLI only).
//! Lib callers build [`ImportOpts`](crate::ImportOpts) themselves.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ImportError;
use crate::utils::config::PackagePaths;
use crate::{Delimiters, Opts};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CredsinkToml {
    #[serde(default)]
    settings: ImportSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportSection {
    db_path: Option<String>,
    delimiters: Option<String>,
    concurrency: Option<usize>,
    batch_size: Option<usize>,
    suffix: Option<String>,
    follow_links: Option<bool>,
    parallel_walk: Option<bool>,
    record_queue_cap: Option<usize>,
    encrypt: Option<bool>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir`. Ok(None) when there is none; a file that exists but does
/// not parse is a configuration error.
pub(crate) fn load_credsink_toml(dir: &Path) -> Result<Option<CredsinkToml>, ImportError> {
    let path = dir.join(PackagePaths::get().config_filename());
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    toml::from_str(&s)
        .map(Some)
        .map_err(|e| ImportError::Config(format!("{}: {}", path.display(), e)))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
/// dry_run is never read from the file.
pub(crate) fn apply_file_to_opts(file: &CredsinkToml, opts: &mut Opts) -> Result<(), ImportError> {
    let sec = &file.settings;
    if let Some(ref p) = sec.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    if let Some(ref d) = sec.delimiters {
        opts.import.delimiters = d.parse::<Delimiters>()?;
    }
    if let Some(ref s) = sec.suffix {
        opts.import.suffix = s.clone();
    }
    apply_file_opt!(sec, opts, concurrency => import.num_workers);
    apply_file_opt!(sec, opts, batch_size => import.batch_size);
    apply_file_opt!(sec, opts, follow_links => import.follow_links);
    apply_file_opt!(sec, opts, parallel_walk => import.parallel_walk);
    apply_file_opt!(sec, opts, record_queue_cap => import.record_queue_cap);
    apply_file_opt!(sec, opts, encrypt => encrypt);
    apply_file_opt!(sec, opts, verbose => verbose);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> CredsinkToml {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn only_present_fields_override() {
        let file = parse(
            r#"
            [settings]
            delimiters = "|"
            batch_size = 50
            verbose = true
            "#,
        );
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts).unwrap();
        assert_eq!(opts.import.delimiters.chars(), &['|']);
        assert_eq!(opts.import.batch_size, 50);
        assert!(opts.verbose);
        assert_eq!(opts.import.num_workers, 10);
        assert_eq!(opts.import.suffix, ".txt");
        assert!(opts.db_path.is_none());
    }

    #[test]
    fn empty_file_changes_nothing() {
        let mut opts = Opts::default();
        apply_file_to_opts(&parse(""), &mut opts).unwrap();
        assert_eq!(opts.import.batch_size, 1000);
        assert!(!opts.encrypt);
    }

    #[test]
    fn empty_delimiters_are_rejected() {
        let file = parse("[settings]\ndelimiters = \"\"\n");
        let mut opts = Opts::default();
        assert!(matches!(
            apply_file_to_opts(&file, &mut opts),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn unknown_key_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".credsink.toml"),
            "[settings]\nbatchsize = 5\n",
        )
        .unwrap();
        assert!(matches!(
            load_credsink_toml(dir.path()),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_credsink_toml(dir.path()).unwrap().is_none());
    }
}
