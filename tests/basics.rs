use tenant_di::{
    BindingCollection, DiError, FixedTenant, Resolver, TenantId, TypeDescriptor,
};
use std::sync::{Arc, Mutex};

fn fixed_tenant() -> Arc<FixedTenant> {
    Arc::new(FixedTenant::new(TenantId::new_v4()))
}

#[test]
fn test_constant_singleton() {
    let mut bindings = BindingCollection::new();
    bindings.bind::<usize>().to_constant(42usize).singleton();
    bindings.bind::<String>().to_constant("hello".to_string());

    let container = bindings.build(fixed_tenant()).unwrap();

    let num1 = container.get_required::<usize>();
    let num2 = container.get_required::<usize>();
    let str1 = container.get_required::<String>();
    let str2 = container.get_required::<String>();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2));
    // Constants are shared even when transient
    assert!(Arc::ptr_eq(&str1, &str2));
}

#[test]
fn test_type_with_dependencies() {
    #[derive(Debug)]
    struct Config {
        port: u16,
    }

    #[derive(Debug)]
    struct Server {
        config: Arc<Config>,
        name: String,
    }

    let mut bindings = BindingCollection::new();
    bindings.bind::<Config>().to_constant(Config { port: 8080 });
    bindings
        .bind::<Server>()
        .to_type(
            TypeDescriptor::builder::<Server>()
                .inject(|(config,): (Arc<Config>,)| Server {
                    config,
                    name: "MyServer".to_string(),
                })
                .build(),
        )
        .singleton();

    let container = bindings.build(fixed_tenant()).unwrap();
    let server = container.get_required::<Server>();

    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
    assert!(Arc::ptr_eq(&server, &container.get_required::<Server>()));
}

#[test]
fn test_transient_creates_new_instances() {
    let counter = Arc::new(Mutex::new(0));
    let counter_clone = counter.clone();

    let mut bindings = BindingCollection::new();
    bindings.bind::<String>().to_callback(move || {
        let mut c = counter_clone.lock().unwrap();
        *c += 1;
        Arc::new(format!("instance-{}", *c))
    });

    let container = bindings.build(fixed_tenant()).unwrap();

    let a = container.get_required::<String>();
    let b = container.get_required::<String>();
    let c = container.get_required::<String>();

    assert_eq!(*a, "instance-1");
    assert_eq!(*b, "instance-2");
    assert_eq!(*c, "instance-3");
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&b, &c));
}

#[test]
fn test_trait_object_through_view() {
    trait Logger: Send + Sync {
        fn log(&self, msg: &str) -> String;
    }

    struct ConsoleLogger;

    impl Logger for ConsoleLogger {
        fn log(&self, msg: &str) -> String {
            format!("console: {}", msg)
        }
    }

    let mut bindings = BindingCollection::new();
    bindings
        .bind::<dyn Logger>()
        .to_type(
            TypeDescriptor::builder::<ConsoleLogger>()
                .constructor(|| ConsoleLogger)
                .exposes::<dyn Logger>(|logger| logger as Arc<dyn Logger>)
                .build(),
        )
        .singleton();

    let container = bindings.build(fixed_tenant()).unwrap();
    let logger = container.get_required::<dyn Logger>();
    assert_eq!(logger.log("hi"), "console: hi");
}

#[test]
fn test_type_not_exposing_service_is_a_configuration_error() {
    trait Clock: Send + Sync {}
    struct Wall;

    let mut bindings = BindingCollection::new();
    bindings.bind::<dyn Clock>().to_type(TypeDescriptor::of(|| Wall));

    let container = bindings.build(fixed_tenant()).unwrap();
    assert!(!container.validate().is_valid());
    assert!(matches!(
        container.get::<dyn Clock>(),
        Err(DiError::Configuration { .. })
    ));
}

#[test]
fn test_two_constructors_fail_activation() {
    struct Ambiguous;

    let mut bindings = BindingCollection::new();
    bindings.bind::<Ambiguous>().to_type(
        TypeDescriptor::builder::<Ambiguous>()
            .constructor(|| Ambiguous)
            .constructor(|| Ambiguous)
            .build(),
    );

    let container = bindings.build(fixed_tenant()).unwrap();
    match container.get::<Ambiguous>() {
        Err(DiError::Configuration { type_name, .. }) => assert!(type_name.ends_with("Ambiguous")),
        other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_type_callback_builds_returned_type() {
    struct Connection {
        url: &'static str,
    }

    let mut bindings = BindingCollection::new();
    bindings
        .bind::<Connection>()
        .to_type_callback(|| TypeDescriptor::of(|| Connection { url: "memory://" }))
        .singleton();

    let container = bindings.build(fixed_tenant()).unwrap();
    let first = container.get_required::<Connection>();
    assert_eq!(first.url, "memory://");
    assert!(Arc::ptr_eq(&first, &container.get_required::<Connection>()));
}

#[test]
fn test_missing_binding() {
    let container = BindingCollection::new().build(fixed_tenant()).unwrap();
    match container.get::<u32>() {
        Err(DiError::BindingNotFound(name)) => assert_eq!(name, "u32"),
        other => panic!("expected not found, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[should_panic(expected = "Failed to resolve")]
fn test_get_required_panics_when_missing() {
    let container = BindingCollection::new().build(fixed_tenant()).unwrap();
    let _ = container.get_required::<u32>();
}
