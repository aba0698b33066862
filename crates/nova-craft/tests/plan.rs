use nova_core::ItemId;
use nova_craft::{CraftError, CraftPlan, NodeStatus};

fn id(s: &str) -> ItemId {
    ItemId::from(s)
}

#[test]
fn rejects_an_item_already_on_the_stack() {
    let mut plan = CraftPlan::new(8);
    plan.push(id("a"), 1).unwrap();
    plan.push(id("b"), 2).unwrap();

    assert!(plan.is_open(&id("a")));
    assert_eq!(
        plan.push(id("a"), 1),
        Err(CraftError::ResourceMissing { item: id("a") })
    );
    assert_eq!(plan.depth(), 2);
}

#[test]
fn never_grows_past_max_depth() {
    let mut plan = CraftPlan::new(2);
    plan.push(id("a"), 1).unwrap();
    plan.push(id("b"), 1).unwrap();

    assert!(plan.push(id("c"), 1).is_err());
    assert_eq!(plan.top().map(|n| n.item.as_str()), Some("b"));
}

#[test]
fn report_keeps_satisfied_nodes_in_completion_order() {
    let mut plan = CraftPlan::new(8);
    plan.push(id("table"), 1).unwrap();
    plan.set_operations(1);
    plan.push(id("planks"), 4).unwrap();
    plan.set_operations(1);
    plan.mark_in_progress();
    assert_eq!(plan.top().map(|n| n.status), Some(NodeStatus::InProgress));
    plan.complete();

    plan.push(id("glue"), 1).unwrap();
    plan.fail();
    plan.complete();
    assert_eq!(plan.depth(), 0);

    let statuses: Vec<_> = plan.finished().iter().map(|n| n.status).collect();
    assert_eq!(
        statuses,
        vec![NodeStatus::Satisfied, NodeStatus::Failed, NodeStatus::Satisfied]
    );

    let report = plan.into_report(id("table"), 1);
    let items: Vec<&str> = report.steps.iter().map(|n| n.item.as_str()).collect();
    assert_eq!(items, vec!["planks", "table"]);
    assert_eq!(report.operations(), 2);
    assert!(!report.was_on_hand());
}
