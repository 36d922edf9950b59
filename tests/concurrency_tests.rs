use segroute::{App, AppConfig, Dispatcher, FieldKind, FieldLocation, FieldMeta, FieldSchema};
use std::thread;

mod common;
use common::{describe, get};

fn dispatcher() -> Dispatcher {
    let mut app = App::new(AppConfig::default());
    let users = app.router("users");
    let fields =
        FieldSchema::default().field(FieldMeta::new("id", FieldLocation::Path, FieldKind::Integer));
    app.get(users, "/{id}", fields, describe).unwrap();
    app.get(users, "/{id}/files/*rest", FieldSchema::default(), describe)
        .unwrap();
    app.include_router("/users", users).unwrap();
    app.freeze().unwrap()
}

#[test]
fn test_dispatcher_is_send_sync_and_clone() {
    fn assert_traits<T: Send + Sync + Clone + 'static>() {}
    assert_traits::<Dispatcher>();
}

#[test]
fn test_parallel_dispatch_captures_are_per_request() {
    let dispatcher = dispatcher();
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let id = worker * 1000 + i;
                    let resp = dispatcher.dispatch(get(&format!("/users/{id}")));
                    assert_eq!(resp.status, 200);
                    assert_eq!(resp.body["params"]["id"], id.to_string());
                    assert_eq!(resp.body["input"]["id"], id);

                    let resp = dispatcher.dispatch(get(&format!("/users/{id}/files/w{worker}/{i}")));
                    assert_eq!(resp.body["params"]["rest"], format!("w{worker}/{i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_request_ids_are_unique_across_threads() {
    let dispatcher = dispatcher();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                (0..100)
                    .map(|_| {
                        dispatcher
                            .dispatch(get("/users/1"))
                            .get_header("x-request-id")
                            .unwrap()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
}
