use weir::{Initial, Injectable, Injector, Key, Param, Registry, State, StdError, injectable};

#[derive(Clone, Debug, PartialEq)]
struct Settings {
    prefix: String,
}

#[derive(Clone, Debug, PartialEq)]
struct Counter(u32);

#[injectable]
fn load_settings() -> Settings {
    Settings {
        prefix: "Hello".to_string(),
    }
}

#[injectable]
async fn count_prefix(settings: &Settings) -> Result<Counter, StdError> {
    Ok(Counter(settings.prefix.len() as u32))
}

/// Greets whoever is named in the state.
#[injectable]
pub async fn greet(settings: Settings, counter: &Counter, name: String) -> String {
    format!("{}, {name} ({})", settings.prefix, counter.0)
}

#[injectable]
fn parse_count(raw: String) -> Result<u32, std::num::ParseIntError> {
    raw.parse()
}

#[injectable]
fn nothing() {}

#[test]
fn test_params() {
    assert_eq!(
        greet.params(),
        vec![
            Param::new::<Settings>("settings"),
            Param::new::<Counter>("counter"),
            Param::new::<String>("name"),
        ]
    );
    assert_eq!(count_prefix.params(), vec![Param::new::<Settings>("settings")]);
    assert!(nothing.params().is_empty());
}

#[test]
fn test_names() {
    assert_eq!(greet.name(), concat!(module_path!(), "::greet"));
    assert_eq!(load_settings.name(), concat!(module_path!(), "::load_settings"));
}

#[test]
fn test_output_type() {
    fn output_key<T: Injectable>(_: &T) -> Key {
        Key::of::<T::Output>()
    }
    assert_eq!(output_key(&count_prefix), Key::of::<Counter>());
    assert_eq!(output_key(&parse_count), Key::of::<u32>());
    assert_eq!(output_key(&nothing), Key::of::<()>());
}

#[tokio::test]
async fn test_run() {
    let injector = Injector::new(
        Registry::new().with(load_settings).with(count_prefix),
        Initial::new().slot::<String>("name"),
    );
    let mut state = State::new().with("name", "Ann".to_string());
    let output = injector.run(&greet, &mut state).await.unwrap();
    assert_eq!(output, "Hello, Ann (5)");
    assert_eq!(state.provided::<Counter>(), Some(&Counter(5)));
}

#[tokio::test]
async fn test_run_error() {
    let injector = Injector::new(Registry::new(), Initial::new().slot::<String>("raw"));

    let mut state = State::new().with("raw", "42".to_string());
    assert_eq!(injector.run(&parse_count, &mut state).await.unwrap(), 42);

    let mut state = State::new().with("raw", "forty two".to_string());
    let err = injector.run(&parse_count, &mut state).await.unwrap_err();
    let source = err.into_failure().unwrap();
    assert!(source.downcast_ref::<std::num::ParseIntError>().is_some());
}

#[tokio::test]
async fn test_run_without_params() {
    let injector = Injector::new(Registry::new(), Initial::new());
    injector.run(&nothing, &mut State::new()).await.unwrap();
}
