//! Unit tests for flame2-mem.

#[cfg(test)]
mod column {
    use crate::{MemError, VarColumn};
    use flame2_core::{Value, VarType};

    #[test]
    fn push_and_read_back() {
        let mut col = VarColumn::new(VarType::Int);
        col.push(Value::Int(1)).unwrap();
        col.push(Value::Int(2)).unwrap();
        assert_eq!(col.len(), 2);
        assert_eq!(col.value_at(0), Some(Value::Int(1)));
        assert_eq!(col.value_at(1), Some(Value::Int(2)));
        assert_eq!(col.value_at(2), None);
    }

    #[test]
    fn push_wrong_type_fails() {
        let mut col = VarColumn::new(VarType::Int);
        let err = col.push(Value::Double(1.0)).unwrap_err();
        assert!(matches!(err, MemError::MismatchedType { .. }));
        assert!(col.is_empty());
    }

    #[test]
    fn append_from_same_type() {
        let mut a = VarColumn::new(VarType::Double);
        a.push(Value::Double(1.0)).unwrap();
        let mut b = VarColumn::new(VarType::Double);
        b.push(Value::Double(2.0)).unwrap();
        b.push(Value::Double(3.0)).unwrap();

        a.append_from(&b).unwrap();
        assert_eq!(a.as_doubles().unwrap(), &[1.0, 2.0, 3.0]);
        // Source is unchanged by an append.
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn append_from_mismatched_type_fails() {
        let mut a = VarColumn::new(VarType::Int);
        let b = VarColumn::new(VarType::Double);
        assert!(matches!(
            a.append_from(&b),
            Err(MemError::MismatchedType { .. })
        ));
    }

    #[test]
    fn clone_empty_keeps_tag_drops_data() {
        let mut col = VarColumn::new(VarType::Double);
        col.push(Value::Double(9.0)).unwrap();
        let fresh = col.clone_empty();
        assert_eq!(fresh.var_type(), VarType::Double);
        assert!(fresh.is_empty());
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn clear_keeps_tag() {
        let mut col = VarColumn::new(VarType::Int);
        col.push(Value::Int(5)).unwrap();
        col.clear();
        assert!(col.is_empty());
        assert_eq!(col.var_type(), VarType::Int);
    }
}

#[cfg(test)]
mod registration {
    use crate::{MemError, MemoryManager};
    use flame2_core::VarType;

    fn manager_with_circle() -> MemoryManager {
        let mgr = MemoryManager::new();
        mgr.register_agent("Circle").unwrap();
        mgr.register_variable::<i32>("Circle", "id").unwrap();
        mgr.register_variable::<f64>("Circle", "x").unwrap();
        mgr
    }

    #[test]
    fn duplicate_agent_fails() {
        let mgr = manager_with_circle();
        assert!(matches!(
            mgr.register_agent("Circle"),
            Err(MemError::AlreadyExists { what: "agent", .. })
        ));
    }

    #[test]
    fn duplicate_variable_fails() {
        let mgr = manager_with_circle();
        assert!(matches!(
            mgr.register_variable::<f64>("Circle", "x"),
            Err(MemError::AlreadyExists { what: "variable", .. })
        ));
    }

    #[test]
    fn unknown_agent_fails() {
        let mgr = manager_with_circle();
        assert!(matches!(
            mgr.register_variable::<f64>("Square", "x"),
            Err(MemError::UnknownAgent(_))
        ));
        assert!(matches!(mgr.shadow("Square"), Err(MemError::UnknownAgent(_))));
    }

    #[test]
    fn shadow_closes_registration() {
        let mgr = manager_with_circle();
        let _shadow = mgr.shadow("Circle").unwrap();
        assert!(matches!(
            mgr.register_agent("Square"),
            Err(MemError::RegistrationClosed(_))
        ));
        assert!(matches!(
            mgr.register_variable::<f64>("Circle", "y"),
            Err(MemError::RegistrationClosed(_))
        ));
    }

    #[test]
    fn hint_population_closes_agent() {
        let mgr = manager_with_circle();
        mgr.hint_population("Circle", 100).unwrap();
        assert!(matches!(
            mgr.register_variable::<f64>("Circle", "y"),
            Err(MemError::RegistrationClosed(_))
        ));
    }

    #[test]
    fn schema_preserves_registration_order() {
        let mgr = manager_with_circle();
        mgr.register_agent("Square").unwrap();
        mgr.register_variable::<f64>("Square", "side").unwrap();

        let schema = mgr.schema();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].name, "Circle");
        assert_eq!(
            schema[0].vars,
            vec![("id".to_owned(), VarType::Int), ("x".to_owned(), VarType::Double)]
        );
        assert_eq!(schema[1].name, "Square");
    }

    #[test]
    fn population_grows_with_pushes() {
        let mgr = manager_with_circle();
        assert_eq!(mgr.population_size("Circle").unwrap(), 0);
        for i in 0..4 {
            mgr.push_value("Circle", "id", (i as i32).into()).unwrap();
            mgr.push_value("Circle", "x", (i as f64).into()).unwrap();
        }
        assert_eq!(mgr.population_size("Circle").unwrap(), 4);
    }

    #[test]
    fn push_value_checks_names_and_types() {
        let mgr = manager_with_circle();
        assert!(matches!(
            mgr.push_value("Circle", "nope", 0i32.into()),
            Err(MemError::UnknownVariable { .. })
        ));
        assert!(matches!(
            mgr.push_value("Circle", "id", 0.5f64.into()),
            Err(MemError::MismatchedType { .. })
        ));
    }
}

#[cfg(test)]
mod iterator {
    use crate::{Access, MemError, MemoryManager};

    /// Mirrors the Circle fixture used across the memory tests: one int
    /// column and three doubles, ten rows.
    fn populated_manager() -> MemoryManager {
        let mgr = MemoryManager::new();
        mgr.register_agent("Circle").unwrap();
        mgr.register_variable::<i32>("Circle", "x_int").unwrap();
        mgr.register_variable::<f64>("Circle", "y_dbl").unwrap();
        mgr.register_variable::<f64>("Circle", "z_dbl").unwrap();
        mgr.register_variable::<f64>("Circle", "q_dbl").unwrap();
        mgr.hint_population("Circle", 10).unwrap();
        for i in 0..10 {
            mgr.push_value("Circle", "x_int", (i as i32).into()).unwrap();
            mgr.push_value("Circle", "y_dbl", (i as f64).into()).unwrap();
            mgr.push_value("Circle", "z_dbl", (i as f64 * 2.0).into()).unwrap();
            mgr.push_value("Circle", "q_dbl", (i as f64 * 3.0).into()).unwrap();
        }
        mgr
    }

    #[test]
    fn walk_without_access() {
        let mgr = populated_manager();
        let shadow = mgr.shadow("Circle").unwrap();
        assert_eq!(shadow.population(), 10);

        let mut iter = shadow.iter().unwrap();
        assert_eq!(iter.len(), 10);
        assert_eq!(iter.position(), 0);
        for i in 0..10 {
            assert!(!iter.at_end());
            assert_eq!(iter.position(), i);
            assert!(iter.step());
        }
        assert!(!iter.step());
        assert!(iter.at_end());
    }

    #[test]
    fn acl_and_type_errors() {
        let mgr = populated_manager();
        let mut shadow = mgr.shadow("Circle").unwrap();

        assert!(matches!(
            shadow.allow("not_a_var", Access::Read),
            Err(MemError::UnknownVariable { .. })
        ));
        shadow.allow("x_int", Access::Read).unwrap();
        shadow.allow("y_dbl", Access::Read).unwrap();
        shadow.allow("z_dbl", Access::ReadWrite).unwrap();

        let mut iter = shadow.iter().unwrap();

        // Variable exists but was not granted.
        assert!(matches!(
            iter.get::<f64>("q_dbl"),
            Err(MemError::AccessDenied { .. })
        ));
        // Variable does not exist at all — same observable failure.
        assert!(matches!(
            iter.get::<f64>("not_a_var"),
            Err(MemError::AccessDenied { .. })
        ));
        // Wrong scalar type.
        assert!(matches!(
            iter.get::<f64>("x_int"),
            Err(MemError::MismatchedType { .. })
        ));
        // Writing without a ReadWrite grant.
        assert!(matches!(
            iter.set::<i32>("x_int", 0),
            Err(MemError::AccessDenied { .. })
        ));

        // Read every row, then observe the end.
        for i in 0..10 {
            assert_eq!(iter.get::<i32>("x_int").unwrap(), i as i32);
            assert_eq!(iter.get::<f64>("y_dbl").unwrap(), i as f64);
            assert_eq!(iter.get::<f64>("z_dbl").unwrap(), i as f64 * 2.0);
            assert!(iter.step());
        }
        assert!(matches!(
            iter.get::<i32>("x_int"),
            Err(MemError::OutOfRange(_))
        ));

        // Rewind, write through the ReadWrite grant, verify.
        iter.rewind();
        while !iter.at_end() {
            let z = iter.get::<f64>("z_dbl").unwrap();
            iter.set("z_dbl", z * 2.0).unwrap();
            iter.step();
        }
        iter.rewind();
        for i in 0..10 {
            assert_eq!(iter.get::<f64>("z_dbl").unwrap(), i as f64 * 4.0);
            iter.step();
        }
    }

    #[test]
    fn range_iteration() {
        let mgr = populated_manager();
        let mut shadow = mgr.shadow("Circle").unwrap();
        shadow.allow("x_int", Access::Read).unwrap();

        // Out-of-range requests are rejected up front.
        assert!(matches!(
            shadow.iter_range(11, 1),
            Err(MemError::OutOfRange(_))
        ));
        assert!(matches!(
            shadow.iter_range(1, 10),
            Err(MemError::OutOfRange(_))
        ));

        // A middle slice sees absolute rows 2..7 at relative positions 0..5.
        let mut iter = shadow.iter_range(2, 5).unwrap();
        assert_eq!(iter.position(), 0);
        assert_eq!(iter.len(), 5);
        let mut expected = 2;
        while !iter.at_end() {
            assert_eq!(iter.get::<i32>("x_int").unwrap(), expected);
            assert_eq!(iter.absolute_row(), expected as usize);
            iter.step();
            expected += 1;
        }
        assert_eq!(expected, 7);
        assert_eq!(iter.position(), 5);

        // Rewind stays within the slice.
        iter.rewind();
        assert_eq!(iter.get::<i32>("x_int").unwrap(), 2);
    }

    #[test]
    fn new_iterator_sees_grown_population() {
        let mgr = populated_manager();
        let shadow = mgr.shadow("Circle").unwrap();
        assert_eq!(shadow.iter().unwrap().len(), 10);

        for i in 10..15 {
            mgr.push_value("Circle", "x_int", (i as i32).into()).unwrap();
            mgr.push_value("Circle", "y_dbl", (i as f64).into()).unwrap();
            mgr.push_value("Circle", "z_dbl", 0.0.into()).unwrap();
            mgr.push_value("Circle", "q_dbl", 0.0.into()).unwrap();
        }
        assert_eq!(shadow.iter().unwrap().len(), 15);
    }

    #[test]
    fn empty_population_is_at_end_immediately() {
        let mgr = MemoryManager::new();
        mgr.register_agent("Ghost").unwrap();
        mgr.register_variable::<i32>("Ghost", "n").unwrap();
        let shadow = mgr.shadow("Ghost").unwrap();
        let mut iter = shadow.iter().unwrap();
        assert!(iter.at_end());
        assert!(!iter.step());
        assert!(iter.is_empty());
    }

    #[test]
    fn disjoint_ranges_cover_whole_population() {
        let mgr = populated_manager();
        let mut shadow = mgr.shadow("Circle").unwrap();
        shadow.allow("z_dbl", Access::ReadWrite).unwrap();

        // Two disjoint halves, written independently.
        for (off, cnt, val) in [(0usize, 5usize, -1.0f64), (5, 5, -2.0)] {
            let mut iter = shadow.iter_range(off, cnt).unwrap();
            while !iter.at_end() {
                iter.set("z_dbl", val).unwrap();
                iter.step();
            }
        }
        let mut iter = shadow.iter().unwrap();
        for i in 0..10 {
            let expected = if i < 5 { -1.0 } else { -2.0 };
            assert_eq!(iter.get::<f64>("z_dbl").unwrap(), expected);
            iter.step();
        }
    }
}
