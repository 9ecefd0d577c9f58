use rowscribe_core::{TableRef, quote_ident};
use rowscribe_extract::Filter;

/// Schema holding the migration tables unless configured otherwise.
pub const MIGRATION_SCHEMA: &str = "kmznmst";

/// The fixed tables read for one network element, in declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationTable {
    SendBase,
    CollectBase,
    CollectServer,
    Workflow,
    FileFormat,
}

impl MigrationTable {
    pub const ALL: [MigrationTable; 5] = [
        MigrationTable::SendBase,
        MigrationTable::CollectBase,
        MigrationTable::CollectServer,
        MigrationTable::Workflow,
        MigrationTable::FileFormat,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MigrationTable::SendBase => "tb_cdrsend_base_info",
            MigrationTable::CollectBase => "tb_cdrcoll_base_info",
            MigrationTable::CollectServer => "tb_cdrcoll_srvr_info",
            MigrationTable::Workflow => "tb_wflow_info",
            MigrationTable::FileFormat => "tb_file_fmt_info",
        }
    }

    pub fn table_ref(self, schema: &str) -> TableRef {
        TableRef::new(schema, self.name())
    }

    /// Row predicate with the source NE id as `$1`.
    ///
    /// Workflow and file format rows depend on the source's live send rows;
    /// the dependency is a sub-select so every table can be read on its own.
    pub fn predicate(self, schema: &str) -> String {
        let send_base = format!(
            "{}.{}",
            quote_ident(schema),
            quote_ident(MigrationTable::SendBase.name())
        );
        match self {
            MigrationTable::SendBase | MigrationTable::CollectBase => {
                "ne_id = $1 AND exp_dt > now()".to_string()
            }
            MigrationTable::CollectServer => "srvr_id = $1 AND exp_dt > now()".to_string(),
            MigrationTable::Workflow => format!(
                "wflow_inst_id IN (SELECT DISTINCT wflow_inst_id FROM {send_base} \
                 WHERE ne_id = $1 AND exp_dt > now() \
                 AND (wflow_inst_id LIKE 'C%' OR wflow_inst_id LIKE 'P%')) \
                 AND exp_dt > now()"
            ),
            MigrationTable::FileFormat => format!(
                "cdr_file_fmt_id IN (\
                 SELECT origin_fmt_id FROM {send_base} \
                 WHERE ne_id = $1 AND exp_dt > now() AND origin_fmt_id IS NOT NULL \
                 UNION \
                 SELECT cdr_change_fmt_id FROM {send_base} \
                 WHERE ne_id = $1 AND exp_dt > now() AND cdr_change_fmt_id IS NOT NULL)"
            ),
        }
    }

    pub fn filter(self, schema: &str, source_id: &str) -> Filter {
        Filter::bound(self.predicate(schema), vec![source_id.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_keep_declared_order() {
        let names: Vec<_> = MigrationTable::ALL.iter().map(|table| table.name()).collect();
        assert_eq!(
            names,
            vec![
                "tb_cdrsend_base_info",
                "tb_cdrcoll_base_info",
                "tb_cdrcoll_srvr_info",
                "tb_wflow_info",
                "tb_file_fmt_info",
            ]
        );
    }

    #[test]
    fn source_id_is_bound_not_interpolated() {
        let hostile = "NE001' OR '1'='1";
        for table in MigrationTable::ALL {
            let filter = table.filter(MIGRATION_SCHEMA, hostile);
            let clause = filter.clause.as_deref().unwrap_or_default();
            assert!(clause.contains("$1"), "{clause}");
            assert!(!clause.contains(hostile));
            assert_eq!(filter.params, vec![hostile.to_string()]);
        }
    }

    #[test]
    fn dependent_tables_read_the_configured_schema() {
        let predicate = MigrationTable::FileFormat.predicate("staging");
        assert!(predicate.contains("\"staging\".\"tb_cdrsend_base_info\""));
        assert!(MigrationTable::Workflow
            .predicate("staging")
            .contains("LIKE 'C%' OR wflow_inst_id LIKE 'P%'"));
        assert_eq!(
            MigrationTable::CollectServer.table_ref("staging").qualified(),
            "staging.tb_cdrcoll_srvr_info"
        );
    }
}
