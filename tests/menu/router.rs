use cfa_tools::host::memory::MemoryHost;
use cfa_tools::menu::router::{ActionRoute, ActionRouter};
use cfa_tools::plugins::action;
use std::sync::{Arc, Mutex};

fn counting(counter: &Arc<Mutex<u32>>) -> cfa_tools::plugins::Action {
    let counter = counter.clone();
    action(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    })
}

#[test]
fn route_runs_only_the_matching_action() {
    // Arrange
    let first = Arc::new(Mutex::new(0));
    let second = Arc::new(Mutex::new(0));
    let router = ActionRouter::new(vec![
        ActionRoute { id: "abc_importer::0".to_string(), action: counting(&first) },
        ActionRoute { id: "abc_importer::1".to_string(), action: counting(&second) },
    ]);
    let mut host = MemoryHost::new();

    // Act
    let matched = router.route("abc_importer::1", &mut host).unwrap();

    // Assert
    assert!(matched);
    assert_eq!(*first.lock().unwrap(), 0);
    assert_eq!(*second.lock().unwrap(), 1);
}

#[test]
fn route_requires_exact_id() {
    let counter = Arc::new(Mutex::new(0));
    let mut router = ActionRouter::default();
    router.add("plugin::0", counting(&counter));
    let mut host = MemoryHost::new();

    let cases = ["plugin::", "plugin::00", "plugin", "other::0", ""];

    for id in cases {
        assert!(!router.route(id, &mut host).unwrap(), "id {:?} should not match", id);
    }
    assert_eq!(*counter.lock().unwrap(), 0);
}

#[test]
fn route_uses_first_registration_for_duplicate_ids() {
    // Arrange
    let first = Arc::new(Mutex::new(0));
    let second = Arc::new(Mutex::new(0));
    let mut router = ActionRouter::default();
    router.add("dup", counting(&first));
    router.add("dup", counting(&second));
    let mut host = MemoryHost::new();

    // Act
    router.route("dup", &mut host).unwrap();

    // Assert
    assert_eq!(*first.lock().unwrap(), 1);
    assert_eq!(*second.lock().unwrap(), 0);
}

#[test]
fn route_propagates_action_errors() {
    let mut router = ActionRouter::default();
    router.add("broken", action(|_| anyhow::bail!("no scene open")));
    let mut host = MemoryHost::new();

    let err = router.route("broken", &mut host).unwrap_err();

    assert!(err.to_string().contains("no scene open"));
}

#[test]
fn actions_receive_the_host() {
    // Arrange
    let mut router = ActionRouter::default();
    router.add(
        "greet",
        action(|host| {
            host.confirm_dialog("Hello", "from a menu item", &["OK"])?;
            Ok(())
        }),
    );
    let mut host = MemoryHost::new();

    // Act
    router.route("greet", &mut host).unwrap();

    // Assert
    let dialog = host.last_dialog().unwrap();
    assert_eq!(dialog.title, "Hello");
    assert_eq!(dialog.message, "from a menu item");
}

#[test]
fn ids_preserve_registration_order() {
    let counter = Arc::new(Mutex::new(0));
    let mut router = ActionRouter::default();
    for id in ["b::0", "a::0", "__manager__"] {
        router.add(id, counting(&counter));
    }

    assert_eq!(router.ids().collect::<Vec<_>>(), vec!["b::0", "a::0", "__manager__"]);
    assert_eq!(router.len(), 3);
    assert!(router.contains("a::0"));
    assert!(!router.is_empty());
}
