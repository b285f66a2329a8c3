//! Unit tests for flame2-core.

#[cfg(test)]
mod task_id {
    use crate::TaskId;

    #[test]
    fn index_round_trip() {
        let id = TaskId::try_from(42usize).unwrap();
        assert_eq!(id, TaskId(42));
        assert_eq!(id.index(), 42);
        assert_eq!(usize::from(id), 42);
    }

    #[test]
    fn term_sentinel() {
        assert!(TaskId::TERM.is_term());
        assert!(!TaskId(0).is_term());
        assert_eq!(format!("{}", TaskId::TERM), "TaskId(TERM)");
        assert_eq!(format!("{}", TaskId(7)), "TaskId(7)");
    }

    #[test]
    fn ordering_follows_index() {
        assert!(TaskId(1) < TaskId(2));
        assert!(TaskId(2) < TaskId::TERM);
    }
}

#[cfg(test)]
mod value {
    use crate::{Value, VarScalar, VarType};

    #[test]
    fn tags_match_variants() {
        assert_eq!(Value::Int(3).var_type(), VarType::Int);
        assert_eq!(Value::Double(0.5).var_type(), VarType::Double);
        assert_eq!(<i32 as VarScalar>::VAR_TYPE, VarType::Int);
        assert_eq!(<f64 as VarScalar>::VAR_TYPE, VarType::Double);
    }

    #[test]
    fn scalar_round_trip() {
        assert_eq!(i32::from_value(7i32.into_value()), Some(7));
        assert_eq!(f64::from_value(1.25f64.into_value()), Some(1.25));
    }

    #[test]
    fn cross_type_unwrap_fails() {
        assert_eq!(i32::from_value(Value::Double(1.0)), None);
        assert_eq!(f64::from_value(Value::Int(1)), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let d = Value::Double(0.30000000000000004);
        let s = d.to_string();
        assert_eq!(s.parse::<f64>().unwrap(), 0.30000000000000004);

        let i = Value::Int(-12);
        assert_eq!(i.to_string().parse::<i32>().unwrap(), -12);
    }

    #[test]
    fn type_names() {
        assert_eq!(VarType::Int.name(), "int");
        assert_eq!(VarType::Double.to_string(), "double");
    }
}
