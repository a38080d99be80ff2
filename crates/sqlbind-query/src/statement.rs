//! Whole statements assembled from clause fragments.

use sqlbind_core::QueryFragment;

/// `select * from <table> where <filter> limit 1 offset 0`.
pub fn select_first_where(table: &str, filter: QueryFragment) -> QueryFragment {
    format!("select * from {} where ", table).as_str() + filter + " limit 1 offset 0"
}

/// `select * from <table> where <filter>`.
pub fn select_where(table: &str, filter: QueryFragment) -> QueryFragment {
    format!("select * from {} where ", table).as_str() + filter
}

/// `update <table> set <set> where <filter>`.
pub fn update_where(table: &str, set: QueryFragment, filter: QueryFragment) -> QueryFragment {
    format!("update {} set ", table).as_str() + set + " where " + filter
}

/// `insert into <table> <values>`, where `values` comes from
/// [`insert_clause`](crate::insert_clause).
pub fn insert_into(table: &str, values: QueryFragment) -> QueryFragment {
    format!("insert into {} ", table).as_str() + values
}

/// `delete from <table> where <filter>`.
pub fn delete_where(table: &str, filter: QueryFragment) -> QueryFragment {
    format!("delete from {} where ", table).as_str() + filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{insert_clause, set_clause, where_equal_clause};
    use sqlbind_core::{Binder, Value};

    #[test]
    fn test_select_first_where() {
        let binder = Binder::new();
        let q = select_first_where("student", where_equal_clause(&binder, [("id", 3_i64)]));
        assert_eq!(
            q.text(),
            "select * from student where id = :0_id limit 1 offset 0"
        );
        assert_eq!(q.binding(":0_id"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_update_where() {
        let binder = Binder::new();
        let q = update_where(
            "student",
            set_clause(&binder, [("score", 20_i64)]),
            where_equal_clause(&binder, [("id", 3_i64)]),
        );
        assert_eq!(
            q.text(),
            "update student set score = :0_score where id = :1_id"
        );
        assert_eq!(q.binding_count(), 2);
    }

    #[test]
    fn test_insert_into_and_delete() {
        let binder = Binder::new();
        let q = insert_into("student", insert_clause(&binder, [("name", "B")]));
        assert_eq!(q.text(), "insert into student (name) values (:0_name)");
        let q = delete_where("student", where_equal_clause(&binder, [("id", 1_i64)]));
        assert_eq!(q.text(), "delete from student where id = :1_id");
        let q = select_where("student", where_equal_clause(&binder, [("name", "B")]));
        assert_eq!(q.text(), "select * from student where name = :2_name");
    }
}
