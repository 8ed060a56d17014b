//! Package classification: local module files first, then the package index.
//!
//! Index lookups run concurrently with a fixed number in flight and are all
//! joined before classification returns. A failed lookup is not retried and
//! counts as Undetermined, exactly like a package that does not exist.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::fs_utils::local_module_names;
use crate::types::{Classified, DEFAULT_INDEX_URL, DEFAULT_REGISTRY_TIMEOUT_SECS};

/// Answer of one existence query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found,
    NotFound,
    Failed(String),
}

/// Something that can tell whether a package name is published.
pub trait PackageRegistry {
    fn lookup(&self, name: &str) -> impl Future<Output = Lookup>;
}

/// Connection settings for [`PypiRegistry`]. How many lookups run at once is
/// a property of the classification, passed to [`classify_packages`].
#[derive(Clone, Debug)]
pub struct RegistryOptions {
    pub index_url: String,
    pub timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REGISTRY_TIMEOUT_SECS),
        }
    }
}

/// PyPI JSON API client: `GET {index_url}/{name}/json`, 200 means published.
pub struct PypiRegistry {
    client: Client,
    index_url: String,
}

impl PypiRegistry {
    pub fn new(options: &RegistryOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("pysetup/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            index_url: options.index_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn package_url(&self, name: &str) -> String {
        format!("{}/{}/json", self.index_url, name)
    }
}

impl PackageRegistry for PypiRegistry {
    async fn lookup(&self, name: &str) -> Lookup {
        match self.client.get(self.package_url(name)).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => Lookup::Found,
            Ok(resp) => {
                debug!("{}: index answered {}", name, resp.status());
                Lookup::NotFound
            }
            Err(err) => Lookup::Failed(err.to_string()),
        }
    }
}

/// Told about index lookups as they finish, in completion order.
pub trait LookupObserver {
    /// Number of names that will be sent to the index.
    fn pending(&self, _count: usize) {}
    fn answered(&self, _name: &str, _answer: &Lookup) {}
}

impl LookupObserver for () {}

/// Classify `names` as Local (a `<name>.py` directly in `reference_dir`),
/// Published or Undetermined, with at most `workers` lookups in flight.
///
/// Every input name lands in exactly one of the three sorted lists.
pub async fn classify_packages<R: PackageRegistry>(
    names: &[String],
    reference_dir: &Path,
    registry: &R,
    workers: usize,
) -> Classified {
    classify_packages_observed(names, reference_dir, registry, workers, &()).await
}

/// [`classify_packages`], reporting each index answer to `observer`.
pub async fn classify_packages_observed<R, O>(
    names: &[String],
    reference_dir: &Path,
    registry: &R,
    workers: usize,
    observer: &O,
) -> Classified
where
    R: PackageRegistry,
    O: LookupObserver + ?Sized,
{
    let names: BTreeSet<&String> = names.iter().collect();
    let local_files: BTreeSet<String> = match local_module_names(reference_dir) {
        Ok(found) => found.into_iter().collect(),
        Err(err) => {
            debug!(
                "no local modules from {}: {}",
                reference_dir.display(),
                err
            );
            BTreeSet::new()
        }
    };

    let mut classified = Classified::default();
    let mut remaining = Vec::new();
    for name in names {
        if local_files.contains(name.as_str()) {
            classified.local.push(name.clone());
        } else {
            remaining.push(name.clone());
        }
    }

    observer.pending(remaining.len());
    let answers: Vec<(String, Lookup)> = stream::iter(remaining)
        .map(|name| async move {
            let answer = registry.lookup(&name).await;
            observer.answered(&name, &answer);
            (name, answer)
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    for (name, answer) in answers {
        match answer {
            Lookup::Found => classified.published.push(name),
            Lookup::NotFound => classified.undetermined.push(name),
            Lookup::Failed(reason) => {
                warn!("lookup for {} failed: {}", name, reason);
                classified.undetermined.push(name);
            }
        }
    }

    classified.published.sort();
    classified.undetermined.sort();
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_REGISTRY_WORKERS;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct MapRegistry {
        answers: HashMap<String, Lookup>,
        calls: AtomicUsize,
    }

    impl MapRegistry {
        fn new(found: &[&str], failing: &[&str]) -> Self {
            let mut answers = HashMap::new();
            for name in found {
                answers.insert(name.to_string(), Lookup::Found);
            }
            for name in failing {
                answers.insert(name.to_string(), Lookup::Failed("timed out".to_string()));
            }
            Self {
                answers,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PackageRegistry for MapRegistry {
        async fn lookup(&self, name: &str) -> Lookup {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.answers.get(name).cloned().unwrap_or(Lookup::NotFound)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn splits_into_three_disjoint_sorted_lists() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("helpers.py"), "").expect("write helpers.py");
        let registry = MapRegistry::new(&["numpy", "requests"], &["flaky"]);
        let input = names(&["requests", "helpers", "numpy", "flaky", "nope_xyz"]);

        let out = classify_packages(&input, dir.path(), &registry, 10).await;
        assert_eq!(out.published, names(&["numpy", "requests"]));
        assert_eq!(out.local, names(&["helpers"]));
        assert_eq!(out.undetermined, names(&["flaky", "nope_xyz"]));
        assert_eq!(out.len(), input.len());
        for name in &input {
            assert!(out.classification_of(name).is_some());
        }
    }

    #[tokio::test]
    async fn local_names_skip_the_registry() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("numpy.py"), "").expect("write numpy.py");
        let registry = MapRegistry::new(&["numpy"], &[]);

        let out = classify_packages(&names(&["numpy"]), dir.path(), &registry, 4).await;
        assert_eq!(out.local, names(&["numpy"]));
        assert!(out.published.is_empty());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn published_output_is_stable_when_fed_back() {
        let dir = tempdir().expect("tempdir");
        let registry = MapRegistry::new(&["attrs", "numpy"], &[]);
        let first = classify_packages(&names(&["numpy", "os", "attrs"]), dir.path(), &registry, 2)
            .await;
        let second = classify_packages(&first.published, dir.path(), &registry, 2).await;
        assert_eq!(second.published, first.published);
        assert!(second.undetermined.is_empty());
    }

    #[tokio::test]
    async fn missing_reference_dir_means_no_local_modules() {
        let dir = tempdir().expect("tempdir");
        let registry = MapRegistry::new(&[], &[]);
        let out = classify_packages(
            &names(&["helpers"]),
            &dir.path().join("does-not-exist"),
            &registry,
            1,
        )
        .await;
        assert_eq!(out.undetermined, names(&["helpers"]));
    }

    #[tokio::test]
    async fn duplicate_inputs_are_classified_once() {
        let dir = tempdir().expect("tempdir");
        let registry = MapRegistry::new(&["numpy"], &[]);
        let out = classify_packages(&names(&["numpy", "numpy"]), dir.path(), &registry, 3).await;
        assert_eq!(out.published, names(&["numpy"]));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Default)]
    struct Tally {
        pending: AtomicUsize,
        answered: Mutex<Vec<String>>,
    }

    impl LookupObserver for Tally {
        fn pending(&self, count: usize) {
            self.pending.store(count, Ordering::SeqCst);
        }

        fn answered(&self, name: &str, _answer: &Lookup) {
            if let Ok(mut seen) = self.answered.lock() {
                seen.push(name.to_string());
            }
        }
    }

    #[tokio::test]
    async fn observer_sees_every_index_answer_but_no_locals() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("helpers.py"), "").expect("write helpers.py");
        let registry = MapRegistry::new(&["numpy"], &["flaky"]);
        let tally = Tally::default();

        let out = classify_packages_observed(
            &names(&["numpy", "helpers", "flaky", "numpy"]),
            dir.path(),
            &registry,
            2,
            &tally,
        )
        .await;
        assert_eq!(out.local, names(&["helpers"]));
        assert_eq!(tally.pending.load(Ordering::SeqCst), 2);
        let mut seen = tally.answered.lock().expect("tally").clone();
        seen.sort();
        assert_eq!(seen, names(&["flaky", "numpy"]));
    }

    struct GateRegistry {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl PackageRegistry for GateRegistry {
        async fn lookup(&self, _name: &str) -> Lookup {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Lookup::NotFound
        }
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_workers() {
        let dir = tempdir().expect("tempdir");
        let registry = GateRegistry {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let input: Vec<String> = (0..25).map(|i| format!("pkg{i}")).collect();
        let out = classify_packages(&input, dir.path(), &registry, 4).await;
        assert_eq!(out.undetermined.len(), 25);
        let peak = registry.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {peak} exceeded 4");
        assert!(peak > 1, "lookups should overlap");
    }

    /// Minimal HTTP responder: 200 for `/numpy/json`, 404 for anything else.
    async fn spawn_fake_index() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 2048];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let status = if request.starts_with("GET /pypi/numpy/json ") {
                        "200 OK"
                    } else {
                        "404 Not Found"
                    };
                    let response =
                        format!("HTTP/1.1 {status}\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}");
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/pypi")
    }

    #[tokio::test]
    async fn pypi_registry_reads_status_codes() {
        let index_url = spawn_fake_index().await;
        let registry = PypiRegistry::new(&RegistryOptions {
            index_url,
            timeout: Duration::from_secs(5),
        })
        .expect("client");
        let dir = tempdir().expect("tempdir");
        let out = classify_packages(&names(&["numpy", "nothing_here"]), dir.path(), &registry, 2)
            .await;
        assert_eq!(out.published, names(&["numpy"]));
        assert_eq!(out.undetermined, names(&["nothing_here"]));
    }

    #[tokio::test]
    async fn unreachable_index_is_undetermined() {
        let registry = PypiRegistry::new(&RegistryOptions {
            index_url: "http://127.0.0.1:1/pypi".to_string(),
            timeout: Duration::from_secs(2),
        })
        .expect("client");
        assert!(matches!(registry.lookup("numpy").await, Lookup::Failed(_)));
    }

    #[tokio::test]
    async fn package_url_trims_trailing_slash() {
        let registry = PypiRegistry::new(&RegistryOptions {
            index_url: "https://pypi.org/pypi/".to_string(),
            ..RegistryOptions::default()
        })
        .expect("client");
        assert_eq!(
            registry.package_url("numpy"),
            "https://pypi.org/pypi/numpy/json"
        );
    }

    #[tokio::test]
    #[ignore = "needs network access to pypi.org"]
    async fn live_pypi_scenario() {
        let registry = PypiRegistry::new(&RegistryOptions::default()).expect("client");
        let dir = tempdir().expect("tempdir");
        let out = classify_packages(
            &names(&["numpy", "definitely_not_a_real_package_xyz123"]),
            dir.path(),
            &registry,
            DEFAULT_REGISTRY_WORKERS,
        )
        .await;
        assert_eq!(out.published, names(&["numpy"]));
        assert_eq!(
            out.undetermined,
            names(&["definitely_not_a_real_package_xyz123"])
        );
    }
}
