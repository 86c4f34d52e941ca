//! Discovers migration files from a directory tree and parses them into
//! structured, totally-ordered records (§4.3).

use std::fs;
use std::path::Path;

use regex::Regex;
use thiserror::Error;

use crate::statement_split::split_statements;

const FILE_NAME_PATTERN: &str = r"^(\d+)__(.+)\.sql$";
const UP_MARKER_PATTERN: &str = r"(?im)^\s*--\s*up\s*$";
const DOWN_MARKER_PATTERN: &str = r"(?im)^\s*--\s*down\s*$";

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to read migration directory `{path}`: {source}")]
    ReadDir { path: String, source: std::io::Error },
    #[error("failed to read migration file `{path}`: {source}")]
    ReadFile { path: String, source: std::io::Error },
}

/// One migration file, parsed but not yet applied: the module it belongs to,
/// its version/name, and its split up/down statement lists.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedMigration {
    pub module_name: String,
    pub version: i64,
    pub name: String,
    pub up_sql: Vec<String>,
    pub down_sql: Vec<String>,
}

/// Enumerates top-level subdirectories of `base_dir` (each a module source)
/// and parses every `^(\d+)__(.+)\.sql$` file within. A missing base
/// directory yields an empty list, never an error (§4.3).
pub fn collect(base_dir: &Path) -> Result<Vec<CollectedMigration>, CollectError> {
    if !base_dir.exists() {
        return Ok(Vec::new());
    }

    let file_name_re = Regex::new(FILE_NAME_PATTERN).expect("static regex is valid");
    let mut migrations = Vec::new();

    let module_dirs = fs::read_dir(base_dir)
        .map_err(|source| CollectError::ReadDir { path: base_dir.display().to_string(), source })?;

    for module_entry in module_dirs {
        let module_entry = module_entry
            .map_err(|source| CollectError::ReadDir { path: base_dir.display().to_string(), source })?;
        let module_path = module_entry.path();
        if !module_path.is_dir() {
            continue;
        }
        let module_name = module_path.file_name().unwrap_or_default().to_string_lossy().to_string();

        let files = fs::read_dir(&module_path)
            .map_err(|source| CollectError::ReadDir { path: module_path.display().to_string(), source })?;

        for file_entry in files {
            let file_entry = file_entry
                .map_err(|source| CollectError::ReadDir { path: module_path.display().to_string(), source })?;
            let file_path = file_entry.path();
            let Some(file_name) = file_path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            let Some(captures) = file_name_re.captures(&file_name) else {
                continue;
            };

            let version: i64 = match captures[1].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let name = captures[2].to_string();

            let contents = fs::read_to_string(&file_path)
                .map_err(|source| CollectError::ReadFile { path: file_path.display().to_string(), source })?;

            if let Some(migration) = parse_migration(&module_name, version, &name, &contents) {
                migrations.push(migration);
            }
        }
    }

    // Globally ordered by (version ascending, module-name ascending); discovery
    // order is otherwise irrelevant (§4.3).
    migrations.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.module_name.cmp(&b.module_name)));
    Ok(migrations)
}

fn parse_migration(module_name: &str, version: i64, name: &str, contents: &str) -> Option<CollectedMigration> {
    let up_re = Regex::new(UP_MARKER_PATTERN).expect("static regex is valid");
    let down_re = Regex::new(DOWN_MARKER_PATTERN).expect("static regex is valid");

    let up_match = up_re.find(contents)?;
    let after_up = &contents[up_match.end()..];

    let (up_body, down_body) = match down_re.find(after_up) {
        Some(down_match) => (&after_up[..down_match.start()], &after_up[down_match.end()..]),
        None => (after_up, ""),
    };

    Some(CollectedMigration {
        module_name: module_name.to_string(),
        version,
        name: name.to_string(),
        up_sql: split_statements(up_body),
        down_sql: split_statements(down_body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_migration(dir: &Path, file_name: &str, contents: &str) {
        let mut file = fs::File::create(dir.join(file_name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn missing_base_directory_yields_empty_list() {
        let result = collect(Path::new("/nonexistent/lpdb-migrations-test")).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn parses_version_name_and_up_down_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let module_dir = tmp.path().join("core");
        fs::create_dir(&module_dir).unwrap();
        write_migration(
            &module_dir,
            "20240101000000__create_users.sql",
            "-- up\nCREATE TABLE users (id UUID PRIMARY KEY);\n-- down\nDROP TABLE users;\n",
        );

        let migrations = collect(tmp.path()).unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].version, 20240101000000);
        assert_eq!(migrations[0].name, "create_users");
        assert_eq!(migrations[0].module_name, "core");
        assert_eq!(migrations[0].up_sql, vec!["CREATE TABLE users (id UUID PRIMARY KEY)"]);
        assert_eq!(migrations[0].down_sql, vec!["DROP TABLE users"]);
    }

    #[test]
    fn file_without_up_marker_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let module_dir = tmp.path().join("core");
        fs::create_dir(&module_dir).unwrap();
        write_migration(&module_dir, "1__no_marker.sql", "CREATE TABLE users (id UUID);");

        assert!(collect(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn non_matching_file_names_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let module_dir = tmp.path().join("core");
        fs::create_dir(&module_dir).unwrap();
        write_migration(&module_dir, "README.md", "not a migration");

        assert!(collect(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn global_order_is_version_then_module_name() {
        let tmp = tempfile::tempdir().unwrap();
        for (module, version) in [("billing", 2), ("core", 2), ("core", 1)] {
            let module_dir = tmp.path().join(module);
            fs::create_dir_all(&module_dir).unwrap();
            write_migration(&module_dir, &format!("{version}__m.sql"), "-- up\nSELECT 1;\n");
        }

        let migrations = collect(tmp.path()).unwrap();
        let ordering: Vec<(i64, &str)> =
            migrations.iter().map(|m| (m.version, m.module_name.as_str())).collect();
        assert_eq!(ordering, vec![(1, "core"), (2, "billing"), (2, "core")]);
    }
}
