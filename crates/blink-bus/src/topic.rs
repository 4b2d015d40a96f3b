/// The closed set of topics every subscriber picks from at subscribe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Sync,
    Event,
    Exec,
    Enricher,
    Tuner,
    Alert,
    Dispatcher,
}

/// Which registry a `Register`/`Unregister` message targets. Without this
/// tag a sync message would be applied to every registry subscribed to
/// `Topic::Sync` regardless of the item's actual type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Rule,
    TuningRule,
    Matcher,
    Enrichment,
    Formatter,
    Dispatcher,
}
