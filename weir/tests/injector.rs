use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use weir::{
    Args, InjectError, Initial, Injectable, Injector, Key, Param, PlanError, Registry, Source,
    State, StdError,
};

type Log = Arc<Mutex<Vec<&'static str>>>;

#[derive(Clone, Debug, PartialEq)]
struct Settings(String);

#[derive(Clone, Debug, PartialEq)]
struct Database(String);

#[derive(Clone, Debug, PartialEq)]
struct Repository(String);

#[derive(Default)]
struct SettingsProvider {
    log: Log,
    calls: Arc<AtomicUsize>,
}

impl Injectable for SettingsProvider {
    type Output = Settings;

    fn params(&self) -> Vec<Param> {
        vec![]
    }

    async fn call(&self, _args: Args<'_>) -> Result<Settings, StdError> {
        self.log.lock().unwrap().push("settings");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Settings("sqlite::memory:".to_string()))
    }
}

#[derive(Default)]
struct DatabaseProvider {
    log: Log,
}

impl Injectable for DatabaseProvider {
    type Output = Database;

    fn params(&self) -> Vec<Param> {
        vec![Param::new::<Settings>("settings")]
    }

    async fn call(&self, mut args: Args<'_>) -> Result<Database, StdError> {
        let settings: &Settings = args.next_ref()?;
        self.log.lock().unwrap().push("database");
        Ok(Database(format!("db({})", settings.0)))
    }
}

#[derive(Default)]
struct RepositoryProvider {
    log: Log,
}

impl Injectable for RepositoryProvider {
    type Output = Repository;

    fn params(&self) -> Vec<Param> {
        vec![
            Param::new::<Database>("database"),
            Param::new::<Settings>("settings"),
        ]
    }

    async fn call(&self, mut args: Args<'_>) -> Result<Repository, StdError> {
        let database: Database = args.next()?;
        let settings: Settings = args.next()?;
        self.log.lock().unwrap().push("repository");
        Ok(Repository(format!("repo({}, {})", database.0, settings.0)))
    }
}

struct Handler;

impl Injectable for Handler {
    type Output = String;

    fn params(&self) -> Vec<Param> {
        vec![
            Param::new::<Repository>("repo"),
            Param::new::<Database>("db"),
        ]
    }

    async fn call(&self, mut args: Args<'_>) -> Result<String, StdError> {
        let repo: Repository = args.next()?;
        let db: Database = args.next()?;
        Ok(format!("{} / {}", repo.0, db.0))
    }
}

struct SettingsPair;

impl Injectable for SettingsPair {
    type Output = (Settings, Settings, usize);

    fn params(&self) -> Vec<Param> {
        vec![
            Param::new::<Settings>("primary"),
            Param::new::<Settings>("replica"),
        ]
    }

    async fn call(&self, mut args: Args<'_>) -> Result<Self::Output, StdError> {
        let primary: Settings = args.next()?;
        let remaining = args.remaining();
        let replica: Settings = args.next()?;
        Ok((primary, replica, remaining))
    }
}

fn registry(log: &Log, calls: &Arc<AtomicUsize>) -> Registry {
    Registry::new()
        .with(RepositoryProvider { log: log.clone() })
        .with(DatabaseProvider { log: log.clone() })
        .with(SettingsProvider {
            log: log.clone(),
            calls: calls.clone(),
        })
}

#[test]
fn test_plan_order() {
    let injector = Injector::new(registry(&Log::default(), &Default::default()), Initial::new());
    let plan = injector.plan(&Handler).unwrap();
    let produced: Vec<_> = plan.steps().iter().map(|v| v.produces()).collect();
    assert_eq!(
        produced,
        vec![
            Key::of::<Settings>(),
            Key::of::<Database>(),
            Key::of::<Repository>(),
        ]
    );
    assert_eq!(
        plan.inputs(),
        &[
            Source::Provided(Key::of::<Repository>()),
            Source::Provided(Key::of::<Database>()),
        ]
    );
}

#[test]
fn test_plan_deterministic() {
    let registry = registry(&Log::default(), &Default::default());
    let first = Injector::new(registry.clone(), Initial::new());
    let second = Injector::new(registry, Initial::new());
    assert_eq!(
        *first.plan(&Handler).unwrap(),
        *second.plan(&Handler).unwrap()
    );
}

#[test]
fn test_plan_cached() {
    let injector = Injector::new(registry(&Log::default(), &Default::default()), Initial::new());
    assert!(!injector.is_planned::<Handler>());
    let first = injector.plan(&Handler).unwrap();
    assert!(injector.is_planned::<Handler>());
    let second = injector.plan(&Handler).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_plan_concurrent() {
    let injector = Injector::new(registry(&Log::default(), &Default::default()), Initial::new());
    let plans: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| injector.plan(&Handler).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for plan in &plans {
        assert_eq!(**plan, *plans[0]);
    }
    let cached = injector.plan(&Handler).unwrap();
    assert_eq!(*cached, *plans[0]);
}

#[tokio::test]
async fn test_run_order_and_dedup() {
    let log = Log::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new(registry(&log, &calls), Initial::new());
    let mut state = State::new();
    let output = injector.run(&Handler, &mut state).await.unwrap();
    assert_eq!(
        output,
        "repo(db(sqlite::memory:), sqlite::memory:) / db(sqlite::memory:)"
    );
    assert_eq!(*log.lock().unwrap(), vec!["settings", "database", "repository"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        state.provided::<Settings>(),
        Some(&Settings("sqlite::memory:".to_string()))
    );
}

#[tokio::test]
async fn test_run_same_type_twice() {
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new(registry(&Log::default(), &calls), Initial::new());
    let plan = injector.plan(&SettingsPair).unwrap();
    assert_eq!(plan.steps().len(), 1);
    assert_eq!(
        plan.inputs(),
        &[
            Source::Provided(Key::of::<Settings>()),
            Source::Provided(Key::of::<Settings>()),
        ]
    );

    let mut state = State::new();
    let (primary, replica, remaining) = injector.run(&SettingsPair, &mut state).await.unwrap();
    assert_eq!(primary, replica);
    assert_eq!(remaining, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_reuses_state() {
    let log = Log::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new(registry(&log, &calls), Initial::new());
    let mut state = State::new();
    injector.run(&Handler, &mut state).await.unwrap();
    injector.run(&Handler, &mut state).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_run_skips_seeded_values() {
    let log = Log::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new(registry(&log, &calls), Initial::new());
    let mut state = State::new();
    state.provide(Settings("postgres://".to_string()));
    let output = injector.run(&Handler, &mut state).await.unwrap();
    assert_eq!(output, "repo(db(postgres://), postgres://) / db(postgres://)");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*log.lock().unwrap(), vec!["database", "repository"]);
}

struct CycleA;

#[derive(Clone)]
struct NodeA;

#[derive(Clone)]
struct NodeB;

impl Injectable for CycleA {
    type Output = NodeA;

    fn params(&self) -> Vec<Param> {
        vec![Param::new::<NodeB>("b")]
    }

    async fn call(&self, _args: Args<'_>) -> Result<NodeA, StdError> {
        Ok(NodeA)
    }
}

struct CycleB;

impl Injectable for CycleB {
    type Output = NodeB;

    fn params(&self) -> Vec<Param> {
        vec![Param::new::<NodeA>("a")]
    }

    async fn call(&self, _args: Args<'_>) -> Result<NodeB, StdError> {
        Ok(NodeB)
    }
}

struct NeedsA;

impl Injectable for NeedsA {
    type Output = ();

    fn params(&self) -> Vec<Param> {
        vec![Param::new::<NodeA>("a")]
    }

    async fn call(&self, _args: Args<'_>) -> Result<(), StdError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_cyclic_dependency() {
    let injector = Injector::new(Registry::new().with(CycleA).with(CycleB), Initial::new());
    let err = injector.plan(&NeedsA).unwrap_err();
    assert_eq!(
        err,
        PlanError::CyclicDependency {
            cycle: vec![
                Key::of::<NodeA>().name(),
                Key::of::<NodeB>().name(),
                Key::of::<NodeA>().name(),
            ],
        }
    );
    assert!(!injector.is_planned::<NeedsA>());
    let err = injector.run(&NeedsA, &mut State::new()).await.unwrap_err();
    assert!(matches!(
        err,
        InjectError::Plan(PlanError::CyclicDependency { .. })
    ));
}

#[test]
fn test_unsatisfiable_dependency() {
    let injector = Injector::new(
        Registry::new().with(RepositoryProvider::default()),
        Initial::new(),
    );
    let err = injector.plan(&Handler).unwrap_err();
    assert_eq!(
        err,
        PlanError::UnsatisfiableDependency {
            key: Key::of::<Database>().name(),
            requested_by: RepositoryProvider::default().name(),
        }
    );
}

struct Paths;

impl Injectable for Paths {
    type Output = (String, String, Settings);

    fn params(&self) -> Vec<Param> {
        vec![
            Param::new::<String>("path"),
            Param::new::<String>("anything"),
            Param::new::<Settings>("settings"),
        ]
    }

    async fn call(&self, mut args: Args<'_>) -> Result<Self::Output, StdError> {
        Ok((args.next()?, args.next()?, args.next()?))
    }
}

#[tokio::test]
async fn test_initial_binding_precedence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let injector = Injector::new(
        Registry::new().with(SettingsProvider {
            log: Log::default(),
            calls: calls.clone(),
        }),
        Initial::new()
            .slot::<String>("user")
            .slot::<String>("path")
            .slot::<Settings>("settings"),
    );
    let plan = injector.plan(&Paths).unwrap();
    assert!(plan.steps().is_empty());
    assert_eq!(
        plan.inputs(),
        &[
            Source::Initial("path"),
            Source::Initial("user"),
            Source::Initial("settings"),
        ]
    );

    let mut state = State::new()
        .with("user", "ann".to_string())
        .with("path", "/users/ann".to_string())
        .with("settings", Settings("initial".to_string()));
    let (path, user, settings) = injector.run(&Paths, &mut state).await.unwrap();
    assert_eq!(path, "/users/ann");
    assert_eq!(user, "ann");
    assert_eq!(settings, Settings("initial".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_param_type_mismatch() {
    let injector = Injector::new(Registry::new(), Initial::new().slot::<u32>("path"));
    let err = injector.plan(&Paths).unwrap_err();
    assert_eq!(
        err,
        PlanError::ParamTypeMismatch {
            param: "path",
            callable: Paths.name(),
            expected: Key::of::<u32>().name(),
            found: Key::of::<String>().name(),
        }
    );
}

#[tokio::test]
async fn test_missing_state() {
    let injector = Injector::new(
        Registry::new().with(SettingsProvider::default()),
        Initial::new().slot::<String>("path"),
    );
    let mut state = State::new().with("path", "/".to_string());
    let (path, anything, _) = injector.run(&Paths, &mut state).await.unwrap();
    assert_eq!(path, "/");
    assert_eq!(anything, "/");

    state.unset("path");
    let err = injector.run(&Paths, &mut state).await.unwrap_err();
    assert!(matches!(
        err,
        InjectError::MissingState { name: "path", .. }
    ));
}

#[derive(Debug)]
struct Boom;

impl std::fmt::Display for Boom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for Boom {}

struct FailingSettings;

impl Injectable for FailingSettings {
    type Output = Settings;

    fn params(&self) -> Vec<Param> {
        vec![]
    }

    async fn call(&self, _args: Args<'_>) -> Result<Settings, StdError> {
        Err(Box::new(Boom))
    }
}

#[tokio::test]
async fn test_provider_failure() {
    let log = Log::default();
    let injector = Injector::new(
        Registry::new()
            .with(FailingSettings)
            .with(DatabaseProvider { log: log.clone() })
            .with(RepositoryProvider { log: log.clone() }),
        Initial::new(),
    );
    let err = injector.run(&Handler, &mut State::new()).await.unwrap_err();
    assert!(matches!(
        err,
        InjectError::Failed { callable, .. } if callable == FailingSettings.name()
    ));
    let source = err.into_failure().unwrap();
    assert!(source.downcast_ref::<Boom>().is_some());
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_registry_replace() {
    let mut registry = Registry::new();
    registry.register(SettingsProvider::default());
    registry.register(DatabaseProvider::default());
    registry.register(FailingSettings);
    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.keys().collect::<Vec<_>>(),
        vec![Key::of::<Settings>(), Key::of::<Database>()]
    );
    let rule = registry.rule(Key::of::<Settings>()).unwrap();
    assert_eq!(rule.name, FailingSettings.name());
    assert!(rule.requires.is_empty());
}

#[test]
fn test_registry_merge() {
    let mut registry = Registry::new().with(SettingsProvider::default());
    registry.merge(
        Registry::new()
            .with(FailingSettings)
            .with(DatabaseProvider::default()),
    );
    assert_eq!(registry.len(), 2);
    assert!(registry.provides::<Database>());
    assert_eq!(
        registry.rule(Key::of::<Settings>()).unwrap().name,
        FailingSettings.name()
    );
    let rule = registry.rule(Key::of::<Database>()).unwrap();
    assert_eq!(rule.requires, vec![Param::new::<Settings>("settings")]);
}
