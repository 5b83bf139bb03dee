use tabula_core::{SqlWriter, writer::Context};

/// SQLite dialect: numbered `?NNN` placeholders.
#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        out.push('?');
        let mut buffer = itoa::Buffer::new();
        out.push_str(buffer.format(context.params.len()));
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN DEFERRED;");
    }
}
