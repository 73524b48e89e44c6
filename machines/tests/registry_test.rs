use cabinet_core::core::Machine;
use cabinet_machines::registry;

#[test]
fn test_builtins_are_registered_in_name_order() {
    let names: Vec<_> = registry::all().iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["latch", "tiles"]);
    assert!(registry::find("tiles").is_some());
    assert!(registry::find("pacman").is_none());
}

#[test]
fn test_every_builtin_builds_and_runs() {
    for entry in registry::all() {
        let mut board = entry
            .create()
            .unwrap_or_else(|e| panic!("{}: {e}", entry.name));
        for _ in 0..3 {
            board.run_frame().unwrap();
        }
        assert_eq!(board.frame(), 3, "{}", entry.name);
        assert_eq!(board.name(), entry.name);
    }
}
