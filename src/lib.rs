pub mod commands;
pub mod error;
pub mod install;
pub mod order;
pub mod package;
pub mod runtime;
pub mod settings;
pub mod version;

/// Test utilities for building package repositories on disk.
#[cfg(test)]
pub mod test_utils {
    use crate::package::RELEASE_TIME_FILE;
    use crate::settings::Settings;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A temporary directory holding three package roots and a few
    /// developer package sources.
    ///
    /// - `solver`: directory families, including timestamped releases
    /// - `yaml`: a combined `multi.yaml` and a second `python-2.7.0`
    /// - `extra`: a combined `multi.json` adding `multi-2.0`
    /// - `dev`: developer packages, each with a `_changed` twin
    pub struct RepoFixture {
        dir: TempDir,
    }

    const TIMESTAMPED: [(&str, u64); 8] = [
        ("1.0.5", 1000),
        ("1.0.6", 2000),
        ("1.1.0", 3000),
        ("1.1.1", 3001),
        ("1.2.0", 4000),
        ("2.0.0", 5000),
        ("2.1.0", 6000),
        ("2.1.5", 7000),
    ];

    impl RepoFixture {
        pub fn new() -> Self {
            let fixture = Self {
                dir: TempDir::new().unwrap(),
            };
            fixture.build_solver();
            fixture.build_yaml();
            fixture.build_extra();
            fixture.build_developer();
            fixture
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        pub fn solver_root(&self) -> PathBuf {
            self.path().join("solver")
        }

        pub fn yaml_root(&self) -> PathBuf {
            self.path().join("yaml")
        }

        pub fn extra_root(&self) -> PathBuf {
            self.path().join("extra")
        }

        pub fn all_roots(&self) -> Vec<PathBuf> {
            vec![self.solver_root(), self.yaml_root(), self.extra_root()]
        }

        pub fn developer(&self, name: &str) -> PathBuf {
            self.path().join("dev").join(name)
        }

        /// Search path is the solver root only.
        pub fn settings(&self) -> Settings {
            Settings {
                packages_path: vec![self.solver_root()],
                local_packages_path: self.path().join("local"),
                ..Settings::default()
            }
        }

        fn write(&self, relative: &str, content: &str) {
            let path = self.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn versioned(&self, root: &str, name: &str, version: &str) {
            self.write(
                &format!("{}/{}/{}/package.yaml", root, name, version),
                &format!("name: {}\nversion: '{}'\n", name, version),
            );
        }

        fn build_solver(&self) {
            for version in ["2.5.2", "2.6.0", "2.6.8", "2.7.0"] {
                self.versioned("solver", "python", version);
            }
            for (name, versions) in [
                ("pysplit", &["5", "6", "7"][..]),
                ("pydad", &["1", "2", "3"][..]),
                ("pymum", &["1", "2", "3"][..]),
            ] {
                for version in versions {
                    self.versioned("solver", name, version);
                }
            }
            for version in ["3.0.0", "3.1.0"] {
                self.write(
                    &format!("solver/pyfoo/{}/package.json", version),
                    &format!(r#"{{"name": "pyfoo", "version": "{}"}}"#, version),
                );
            }
            self.write("solver/nada/package.yaml", "name: nada\n");

            for (version, timestamp) in TIMESTAMPED {
                self.versioned("solver", "timestamped", version);
                self.write(
                    &format!("solver/timestamped/{}/{}", version, RELEASE_TIME_FILE),
                    &format!("{}\n", timestamp),
                );
            }
        }

        fn build_yaml(&self) {
            self.write(
                "yaml/multi.yaml",
                "- name: multi\n  \
                   versions: ['1.0', '1.1', '1.2']\n  \
                   default_version: '1.1'\n  \
                   tools: [tweak]\n\
                 - version: '1.1'\n  \
                   tools: [twerk]\n",
            );
            self.versioned("yaml", "python", "2.7.0");
            self.write(
                "yaml/single_unversioned/package.yaml",
                "name: single_unversioned\n",
            );
            for version in ["1.0", "2.0", "3.0"] {
                self.versioned("yaml", "versioned", version);
            }
        }

        fn build_extra(&self) {
            self.write(
                "extra/multi.json",
                r#"{"name": "multi", "versions": ["2.0"], "tools": ["tweak"]}"#,
            );
        }

        fn build_developer(&self) {
            let foo = |description: &str| {
                format!(
                    "name: foo\n\
                     version: 3.0.1\n\
                     description: {}\n\
                     authors: [joe.bloggs]\n\
                     requires: ['bah-1.2+<2']\n\
                     variants:\n  - [floob-4.1]\n  - [floob-2.0]\n\
                     uuid: 28d94bcd1a934bb4999bcf70a21106cc\n",
                    description
                )
            };
            self.write("dev/developer/package.yaml", &foo("a foo type thing."));
            self.write("dev/developer/floob-4.1/bin/foo", "foo built against floob-4.1");
            self.write("dev/developer/floob-2.0/bin/foo", "foo built against floob-2.0");
            self.write(
                "dev/developer_changed/package.yaml",
                &foo("a foo type thing, improved."),
            );

            let bar = |description: &str| {
                format!(
                    r#"{{"name": "bar", "version": "4.0", "description": "{}", "changelog": "initial"}}"#,
                    description
                )
            };
            self.write("dev/developer_novar/package.json", &bar("a bar."));
            self.write("dev/developer_novar/bin/bar", "bar");
            self.write("dev/developer_novar_changed/package.json", &bar("a better bar."));
        }
    }
}
