//! Settings resolution — turning symbolic contexts into target settings.
//!
//! The engine consumes resolvers through the [`SettingsResolver`] trait
//! and treats resolution as deterministic and side-effect-free. The
//! built-in [`StaticResolver`] expands role names from an in-memory role
//! map and parses anything else as a host string; [`MemoResolver`] caches
//! resolutions per distinct context tuple.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use muster_types::{HostSettings, SettingsList, DEFAULT_PORT};

/// Resolves a tuple of context identifiers into an ordered settings list.
///
/// An empty context tuple resolves to an empty list, which the engine
/// treats as a no-op run.
pub trait SettingsResolver: Send + Sync {
    /// Resolve contexts in order, deduplicating targets.
    fn resolve(&self, contexts: &[String]) -> SettingsList;
}

/// Resolver backed by an in-memory role map.
///
/// A context that names a defined role expands to that role's hosts; any
/// other context is parsed as a `[user@]host[:port]` string. Duplicate
/// targets keep their first position.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    roledefs: BTreeMap<String, Vec<String>>,
    default_user: Option<String>,
    default_port: u16,
}

impl StaticResolver {
    /// Empty resolver: every context is treated as a host string.
    pub fn new() -> Self {
        Self {
            roledefs: BTreeMap::new(),
            default_user: None,
            default_port: DEFAULT_PORT,
        }
    }

    /// Define a role as an ordered list of host strings.
    pub fn role(mut self, name: impl Into<String>, hosts: &[&str]) -> Self {
        self.roledefs
            .insert(name.into(), hosts.iter().map(|h| h.to_string()).collect());
        self
    }

    /// User applied to any host string that names none.
    pub fn default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = Some(user.into());
        self
    }

    /// Port applied to any host string that names none.
    pub fn default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsResolver for StaticResolver {
    fn resolve(&self, contexts: &[String]) -> SettingsList {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for context in contexts {
            let host_strings: Vec<&str> = match self.roledefs.get(context) {
                Some(hosts) => hosts.iter().map(String::as_str).collect(),
                None => vec![context.as_str()],
            };
            for host_string in host_strings {
                let settings = HostSettings::parse(
                    host_string,
                    self.default_user.as_deref(),
                    self.default_port,
                );
                if seen.insert(settings.host_string.clone()) {
                    out.push(settings);
                }
            }
        }
        out
    }
}

/// Memoizing wrapper: caches the inner resolver's answer per distinct
/// context tuple. Invisible to the engine.
pub struct MemoResolver<R> {
    inner: R,
    cache: Mutex<HashMap<Vec<String>, SettingsList>>,
}

impl<R: SettingsResolver> MemoResolver<R> {
    /// Wrap a resolver with a per-tuple cache.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<R: SettingsResolver> SettingsResolver for MemoResolver<R> {
    fn resolve(&self, contexts: &[String]) -> SettingsList {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = cache.get(contexts) {
            return hit.clone();
        }
        let resolved = self.inner.resolve(contexts);
        cache.insert(contexts.to_vec(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn contexts(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn empty_contexts_resolve_to_empty_list() {
        let resolver = StaticResolver::new();
        assert!(resolver.resolve(&[]).is_empty());
    }

    #[test]
    fn role_expands_in_order() {
        let resolver = StaticResolver::new().role("web", &["web1", "web2"]);
        let settings = resolver.resolve(&contexts(&["web", "db1"]));
        let hosts: Vec<_> = settings.iter().map(|s| s.host.as_str()).collect();
        assert_eq!(hosts, vec!["web1", "web2", "db1"]);
    }

    #[test]
    fn duplicates_keep_first_position() {
        let resolver = StaticResolver::new()
            .role("web", &["web1", "web2"])
            .role("all", &["web1", "db1"]);
        let settings = resolver.resolve(&contexts(&["web", "all"]));
        let hosts: Vec<_> = settings.iter().map(|s| s.host.as_str()).collect();
        assert_eq!(hosts, vec!["web1", "web2", "db1"]);
    }

    #[test]
    fn defaults_apply_to_bare_hosts() {
        let resolver = StaticResolver::new()
            .default_user("deploy")
            .default_port(2222);
        let settings = resolver.resolve(&contexts(&["web1", "root@db1:22"]));
        assert_eq!(settings[0].host_string, "deploy@web1:2222");
        assert_eq!(settings[1].host_string, "root@db1:22");
    }

    struct Counting {
        inner: StaticResolver,
        calls: AtomicUsize,
    }

    impl SettingsResolver for Counting {
        fn resolve(&self, contexts: &[String]) -> SettingsList {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(contexts)
        }
    }

    #[test]
    fn memo_resolver_caches_per_tuple() {
        let counting = Counting {
            inner: StaticResolver::new(),
            calls: AtomicUsize::new(0),
        };
        let memo = MemoResolver::new(counting);
        let tuple = contexts(&["web1", "web2"]);
        let first = memo.resolve(&tuple);
        let second = memo.resolve(&tuple);
        assert_eq!(first, second);
        assert_eq!(memo.inner.calls.load(Ordering::SeqCst), 1);

        memo.resolve(&contexts(&["db1"]));
        assert_eq!(memo.inner.calls.load(Ordering::SeqCst), 2);
    }
}
