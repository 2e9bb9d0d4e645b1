use super::*;
use std::cell::RefCell;

fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Answers with a fixed choice and remembers every prompt
struct FixedAnswer {
    answer: &'static str,
    prompts: RefCell<Vec<String>>,
}

impl FixedAnswer {
    fn new(answer: &'static str) -> Self {
        Self {
            answer,
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl Confirm for FixedAnswer {
    fn confirm(&self, prompt: &str, choices: &[&str]) -> Result<String> {
        assert_eq!(choices, CONFIRM_CHOICES);
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.answer.to_string())
    }
}

#[test]
fn test_kubernetes_is_sorted_deduplicated_union() {
    let groups = NodeGroups::new(
        hosts(&["ncn-m002", "ncn-m001"]),
        hosts(&["ncn-w002", "ncn-m001", "ncn-w001", "ncn-w001"]),
    );

    assert_eq!(groups.managers(), hosts(&["ncn-m001", "ncn-m002"]).as_slice());
    assert_eq!(groups.workers(), hosts(&["ncn-m001", "ncn-w001", "ncn-w002"]).as_slice());
    assert_eq!(
        groups.kubernetes(),
        hosts(&["ncn-m001", "ncn-m002", "ncn-w001", "ncn-w002"]).as_slice()
    );
}

#[test]
fn test_static_inventory_union_of_roles() {
    let inventory = StaticInventory::new(hosts(&["m1", "m2"]), hosts(&["w1", "m2"]));
    assert_eq!(
        inventory.members_by_role(&[Role::Manager, Role::Worker]).unwrap(),
        hosts(&["m1", "m2", "w1"])
    );
    assert_eq!(inventory.members_by_role(&[Role::Worker]).unwrap(), hosts(&["m2", "w1"]));
}

#[test]
fn test_confirmed_groups_are_returned() {
    let inventory = StaticInventory::new(hosts(&["m1"]), hosts(&["w1"]));
    let confirm = FixedAnswer::new("yes");

    let groups = resolve_node_groups(&inventory, &confirm).unwrap();
    assert_eq!(groups.kubernetes(), hosts(&["m1", "w1"]).as_slice());

    let prompts = confirm.prompts.borrow();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("managers: [m1]"));
    assert!(prompts[0].contains("workers: [w1]"));
    assert!(prompts[0].contains("kubernetes: [m1, w1]"));
    assert!(prompts[0].ends_with(CONFIRM_QUESTION));
}

#[test]
fn test_empty_group_fails_before_prompting() {
    let inventory = StaticInventory::new(Vec::new(), hosts(&["w1"]));
    let confirm = FixedAnswer::new("yes");

    let err = resolve_node_groups(&inventory, &confirm).unwrap_err();
    match err {
        PlatformError::TopologyDiscovery(empty) => assert_eq!(empty, vec!["managers"]),
        other => panic!("expected TopologyDiscovery, got {:?}", other),
    }
    assert!(confirm.prompts.borrow().is_empty());
}

#[test]
fn test_declined_confirmation_fails() {
    let inventory = StaticInventory::new(hosts(&["m1"]), hosts(&["w1"]));
    let confirm = FixedAnswer::new("no");

    let err = resolve_node_groups(&inventory, &confirm).unwrap_err();
    assert!(matches!(err, PlatformError::ConfirmationDeclined));
}

#[test]
fn test_inventory_error_propagates() {
    struct Broken;
    impl Inventory for Broken {
        fn members_by_role(&self, _roles: &[Role]) -> Result<Vec<String>> {
            Err(PlatformError::Config("inventory unavailable".to_string()))
        }
    }

    let confirm = FixedAnswer::new("yes");
    assert!(resolve_node_groups(&Broken, &confirm).is_err());
    assert!(confirm.prompts.borrow().is_empty());
}
