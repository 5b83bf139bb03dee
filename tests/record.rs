#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::{str::FromStr, sync::Mutex};
    use tabula::{Record, Tracked, Value};
    use time::{Date, Month};
    use uuid::Uuid;

    #[derive(Record, Default, Debug)]
    struct Customer {
        id: Uuid,
        name: String,
        balance: Decimal,
        born: Option<Date>,
        vip: bool,
        #[record(skip)]
        _lock: Mutex<()>,
    }

    #[derive(Record, Default, Debug, Clone, PartialEq)]
    struct Counter {
        r#type: String,
        value: u32,
    }

    #[test]
    fn field_table() {
        assert_eq!(
            Customer::field_names(),
            ["id", "name", "balance", "born", "vip"]
        );
        assert!(!Customer::has_field("_lock"));
        assert_eq!(Counter::field_names(), ["type", "value"]);

        let customer = Customer {
            name: "Ada".into(),
            balance: Decimal::from_str("12.50").unwrap(),
            ..Default::default()
        };
        assert_eq!(
            customer.field("name"),
            Some(Value::Varchar(Some("Ada".into())))
        );
        assert_eq!(
            customer.field("balance"),
            Some(Value::Decimal(Some(Decimal::from_str("12.50").unwrap())))
        );
        assert_eq!(customer.field("born"), Some(Value::Date(None)));
        assert_eq!(customer.field("_lock"), None);
    }

    #[test]
    fn set_field_converts_database_values() {
        let mut customer = Customer::default();
        let id = Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        customer
            .set_field("id", Value::Varchar(Some(id.to_string())))
            .unwrap();
        customer
            .set_field("born", Value::Varchar(Some("1815-12-10".into())))
            .unwrap();
        customer.set_field("vip", Value::Int64(Some(1))).unwrap();
        assert_eq!(customer.id, id);
        assert_eq!(
            customer.born,
            Some(Date::from_calendar_date(1815, Month::December, 10).unwrap())
        );
        assert!(customer.vip);

        let error = customer
            .set_field("name", Value::Int32(Some(3)))
            .unwrap_err();
        assert!(format!("{error:#}").contains("name"));
        assert!(customer.set_field("_lock", Value::Null).is_err());
    }

    #[test]
    fn derived_records_are_tracked() {
        let mut counter = Tracked::new(Counter::default());
        assert!(counter.is_clean());
        counter.r#type = "visits".into();
        assert_eq!(
            counter.compute_dirty(),
            [("type", Value::Varchar(Some("visits".into())))]
        );
        counter.clear();
        assert!(counter.is_clean());
        counter.value += 1;
        assert_eq!(counter.compute_dirty(), [("value", Value::UInt32(Some(1)))]);
        assert_eq!(counter.compute_dirty(), counter.compute_dirty());
    }
}
