// Shape of the object_management tree; building it needs no Vulkan driver

use vk_objmgmt_cts::tree::{object_management_tests, CaseFilter, CaseKind, TestCaseGroup, TestNode};

fn group<'t>(root: &'t TestCaseGroup, name: &str) -> &'t TestCaseGroup {
    root.children()
        .iter()
        .find_map(|node| match node {
            TestNode::Group(group) if group.name() == name => Some(group),
            _ => None,
        })
        .unwrap_or_else(|| panic!("group {} missing", name))
}

fn leaf_names(group: &TestCaseGroup) -> Vec<String> {
    group
        .leaves()
        .into_iter()
        .map(|(path, _)| path.rsplit('.').next().unwrap().to_string())
        .collect()
}

#[test]
fn seven_groups_in_order() {
    let root = object_management_tests(1, 1);
    assert_eq!(root.name(), "object_management");

    let names: Vec<&str> = root
        .children()
        .iter()
        .map(|node| match node {
            TestNode::Group(group) => group.name(),
            TestNode::Case(case) => case.name(),
        })
        .collect();
    let expected: Vec<&str> = CaseKind::ALL.iter().map(|kind| kind.group_name()).collect();
    assert_eq!(names, expected);
}

#[test]
fn leaf_counts_per_group() {
    let root = object_management_tests(1, 1);

    assert_eq!(group(&root, "single").leaves().len(), 43);
    assert_eq!(group(&root, "multiple_unique_resources").leaves().len(), 43);
    assert_eq!(group(&root, "multiple_shared_resources").leaves().len(), 42);
    assert_eq!(group(&root, "max_concurrent").leaves().len(), 43);
    assert_eq!(group(&root, "multithreaded_per_thread_device").leaves().len(), 40);
    assert_eq!(group(&root, "multithreaded_per_thread_resources").leaves().len(), 43);
    assert_eq!(group(&root, "multithreaded_shared_resources").leaves().len(), 39);
    assert_eq!(root.leaves().len(), 293);
}

#[test]
fn single_group_case_order() {
    let root = object_management_tests(1, 1);
    let names = leaf_names(group(&root, "single"));

    assert_eq!(&names[..4], ["instance", "device", "device_group", "device_memory_small"]);
    assert_eq!(
        &names[names.len() - 4..],
        ["command_pool", "command_pool_transient", "command_buffer_primary", "command_buffer_secondary"]
    );

    let sampler = names.iter().position(|name| name == "sampler").unwrap();
    let shader_module = names.iter().position(|name| name == "shader_module").unwrap();
    assert!(sampler < shader_module);
}

#[test]
fn excluded_cases_are_absent() {
    let root = object_management_tests(1, 1);

    let shared = leaf_names(group(&root, "multiple_shared_resources"));
    assert!(!shared.contains(&"instance".to_string()));
    assert!(shared.contains(&"device".to_string()));

    let per_device = leaf_names(group(&root, "multithreaded_per_thread_device"));
    for name in ["instance", "device", "device_group"] {
        assert!(!per_device.iter().any(|leaf| leaf == name), "{}", name);
    }

    let mt_shared = leaf_names(group(&root, "multithreaded_shared_resources"));
    for name in ["instance", "descriptor_set", "command_buffer_primary", "command_buffer_secondary"] {
        assert!(!mt_shared.iter().any(|leaf| leaf == name), "{}", name);
    }
    assert!(mt_shared.contains(&"command_pool".to_string()));
}

#[test]
fn paths_are_unique() {
    let root = object_management_tests(1, 1);
    let mut paths: Vec<String> = root.leaves().into_iter().map(|(path, _)| path).collect();
    let total = paths.len();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), total);
}

#[test]
fn filter_selects_by_wildcard() {
    let root = object_management_tests(1, 1);
    let filter = CaseFilter::new(vec!["object_management.*.image_view_cube*".to_string()]);

    let selected: Vec<String> = root
        .leaves()
        .into_iter()
        .map(|(path, _)| path)
        .filter(|path| filter.matches(path))
        .collect();

    // cube and cube_arr in each of the seven groups
    assert_eq!(selected.len(), 14);
    assert!(selected.contains(&"object_management.single.image_view_cube_arr".to_string()));
}
