use super::*;
use crate::error::{ScopeError, ScopeResult};
use std::sync::{Arc, Mutex};

// ── Shared recording interceptor for tests ──

struct Tag {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Tag {
    fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name,
            log: Arc::clone(log),
        }
    }
}

impl Interceptor<Operation> for Tag {
    fn name(&self) -> &str {
        self.name
    }

    fn wrap(&self, _hook: HookPoint, next: Handler<Operation>) -> Handler<Operation> {
        let name = self.name;
        let log = Arc::clone(&self.log);
        handler(move |op: &mut Operation| {
            log.lock().unwrap().push(format!("{name}:before"));
            next(op);
            log.lock().unwrap().push(format!("{name}:after"));
        })
    }
}

fn recording_registry(log: &Arc<Mutex<Vec<String>>>) -> CallbackRegistry<Operation> {
    let log = Arc::clone(log);
    CallbackRegistry::with_all(move |_op: &mut Operation| {
        log.lock().unwrap().push("handler".to_string());
    })
}

/// Registry whose `replace` fails on one hook point.
struct FlakyRegistry {
    inner: CallbackRegistry<Operation>,
    fail_on: HookPoint,
}

impl HookRegistry for FlakyRegistry {
    type Context = Operation;

    fn get(&self, hook: HookPoint) -> Option<Handler<Operation>> {
        self.inner.get(hook)
    }

    fn replace(&mut self, hook: HookPoint, handler: Handler<Operation>) -> ScopeResult<()> {
        if hook == self.fail_on {
            return Err(ScopeError::Other("registry is read-only".into()));
        }
        self.inner.replace(hook, handler)
    }
}

#[test]
fn test_hook_point_names() {
    let names: Vec<_> = HookPoint::ALL.iter().map(|h| h.as_str()).collect();
    assert_eq!(names, ["create", "update", "delete", "query", "raw", "row"]);
    assert_eq!(HookPoint::Raw.to_string(), "raw");
    assert_eq!("Query".parse::<HookPoint>().unwrap(), HookPoint::Query);
    assert!("select".parse::<HookPoint>().is_err());
}

#[test]
fn test_hook_point_serde() {
    let json = serde_json::to_string(&HookPoint::Delete).unwrap();
    assert_eq!(json, "\"delete\"");
    let hook: HookPoint = serde_json::from_str("\"row\"").unwrap();
    assert_eq!(hook, HookPoint::Row);
}

#[test]
fn test_chain_first_added_is_innermost() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = recording_registry(&log);

    let chain = InterceptorChain::new()
        .add(Tag::new("slow", &log))
        .add(Tag::new("error", &log));
    assert_eq!(chain.names(), ["slow", "error"]);
    chain.install(&mut registry).unwrap();

    registry
        .dispatch(HookPoint::Query, &mut Operation::new("shop", "orders"))
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        [
            "error:before",
            "slow:before",
            "handler",
            "slow:after",
            "error:after",
        ]
    );
}

#[test]
fn test_install_wraps_every_hook_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = recording_registry(&log);

    InterceptorChain::new()
        .add(Tag::new("slow", &log))
        .install(&mut registry)
        .unwrap();

    for hook in HookPoint::ALL {
        registry.dispatch(hook, &mut Operation::default()).unwrap();
    }

    let log = log.lock().unwrap();
    assert_eq!(log.iter().filter(|e| *e == "handler").count(), 6);
    assert_eq!(log.iter().filter(|e| *e == "slow:before").count(), 6);
}

#[test]
fn test_reinstall_composes_with_previous() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = recording_registry(&log);

    install(&mut registry, HookPoint::Create, &Tag::new("a", &log)).unwrap();
    install(&mut registry, HookPoint::Create, &Tag::new("b", &log)).unwrap();

    registry
        .dispatch(HookPoint::Create, &mut Operation::default())
        .unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        ["b:before", "a:before", "handler", "a:after", "b:after"]
    );
}

#[test]
fn test_missing_handler_fails_before_replacing() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let inner = log.clone();
    let mut registry = CallbackRegistry::<Operation>::new();
    for hook in [HookPoint::Create, HookPoint::Update, HookPoint::Delete] {
        let inner = inner.clone();
        registry.register(hook, move |_op: &mut Operation| {
            inner.lock().unwrap().push("handler".to_string());
        });
    }

    let err = InterceptorChain::new()
        .add(Tag::new("slow", &log))
        .install(&mut registry)
        .unwrap_err();
    assert!(matches!(err, ScopeError::MissingHandler(HookPoint::Query)));
    assert!(err.is_setup_failure());

    registry
        .dispatch(HookPoint::Create, &mut Operation::default())
        .unwrap();
    assert_eq!(*log.lock().unwrap(), ["handler"]);
}

#[test]
fn test_failed_replace_rolls_back() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = FlakyRegistry {
        inner: recording_registry(&log),
        fail_on: HookPoint::Raw,
    };

    let err = InterceptorChain::new()
        .add(Tag::new("slow", &log))
        .install(&mut registry)
        .unwrap_err();
    assert_eq!(err.hook_point(), Some(HookPoint::Raw));
    assert!(err.to_string().contains("raw"));

    for hook in HookPoint::ALL {
        registry.inner.dispatch(hook, &mut Operation::default()).unwrap();
    }
    let log = log.lock().unwrap();
    assert!(log.iter().all(|e| e == "handler"));
}

#[test]
fn test_empty_chain_still_validates() {
    let mut registry = CallbackRegistry::<Operation>::new();
    let err = InterceptorChain::new().install(&mut registry).unwrap_err();
    assert!(matches!(err, ScopeError::MissingHandler(HookPoint::Create)));
}

#[test]
fn test_replace_unregistered_hook() {
    let mut registry = CallbackRegistry::<Operation>::new();
    let err = registry
        .replace(HookPoint::Row, handler(|_op: &mut Operation| {}))
        .unwrap_err();
    assert!(matches!(err, ScopeError::Hook { hook: HookPoint::Row, .. }));
    assert!(!registry.contains(HookPoint::Row));
}

#[test]
fn test_operation_context_view() {
    let mut op = Operation::new("shop", "orders")
        .with_sql("SELECT * FROM orders WHERE id = ?")
        .bind(7);
    assert_eq!(op.db_name(), "shop");
    assert_eq!(op.table(), "orders");
    assert_eq!(op.params(), [serde_json::json!(7)]);
    assert!(op.error().is_none());

    op.set_error(crate::OperationError::NotFound);
    assert!(op.error().unwrap().is_not_found());
    op.clear_error();
    assert!(op.error().is_none());
}
