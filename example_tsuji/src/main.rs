use http::Method;
use tsuji_core::{
    EndpointCall, MediaGroup, MediaType, ParamSpec, ParamValue, Registry, RouterConfig,
};

// A hand-wired registry standing in for whatever discovers resource
// methods in a real service. Resolves a few requests and prints what the
// router decided.
fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let registry: Registry<String> = Registry::with_config(RouterConfig::new().with_cache_matches(true));

    registry
        .register_endpoint(
            "/",
            &[Method::GET],
            MediaGroup::new(),
            MediaGroup::new(),
            Vec::new(),
            |_: EndpointCall<'_>| "welcome".to_string(),
        )
        .expect("register /");

    registry
        .register_endpoint(
            "/users/{id}",
            &[Method::GET],
            MediaGroup::new(),
            MediaGroup::new(),
            vec![ParamSpec::text("id")],
            |call: EndpointCall<'_>| match &call.args[0] {
                ParamValue::Text(id) => format!("user page for {}", id),
                other => format!("unexpected binding {:?}", other),
            },
        )
        .expect("register /users/{id}");

    registry
        .register_endpoint(
            "/orders/{id:\\d+}",
            &[Method::GET],
            MediaGroup::new(),
            MediaGroup::new(),
            vec![ParamSpec::long("id")],
            |call: EndpointCall<'_>| format!("order {:?}", call.args[0]),
        )
        .expect("register /orders/{id}");

    // Two representations of the same report; Accept decides.
    registry
        .register_endpoint(
            "/report",
            &[Method::GET],
            MediaGroup::new(),
            vec![MediaType::application_json()].into(),
            Vec::new(),
            |_: EndpointCall<'_>| "{\"report\":42}".to_string(),
        )
        .expect("register /report json");
    registry
        .register_endpoint(
            "/report",
            &[Method::GET],
            MediaGroup::new(),
            vec![MediaType::text_html()].into(),
            Vec::new(),
            |_: EndpointCall<'_>| "<h1>report 42</h1>".to_string(),
        )
        .expect("register /report html");

    registry.freeze();
    println!("routing tree: {}\n", registry.root());

    let requests: Vec<(Method, &str, Vec<(String, String)>)> = vec![
        (Method::GET, "/", vec![]),
        (Method::GET, "/users/ada", vec![]),
        (Method::GET, "/orders/1042", vec![]),
        (Method::GET, "/orders/not-a-number", vec![]),
        (Method::POST, "/users/ada", vec![]),
        (
            Method::GET,
            "/report",
            vec![("Accept".to_string(), "application/json;q=0.9, text/html;q=0.2".to_string())],
        ),
        (
            Method::GET,
            "/report",
            vec![("Accept".to_string(), "text/html".to_string())],
        ),
    ];

    for (verb, uri, headers) in requests {
        match registry.resolve(&verb, uri, &headers) {
            Ok(Some(matched)) => {
                let body = registry.invoke(&matched, &verb, uri, &headers, &[], &[]);
                println!(
                    "{} {} -> {} (params {:?}): {}",
                    verb,
                    uri,
                    matched.endpoint().metadata().template(),
                    matched.values(),
                    body
                );
            }
            Ok(None) => println!("{} {} -> no matching endpoint", verb, uri),
            Err(e) => println!("{} {} -> bad request: {}", verb, uri, e),
        }
    }
}
