use super::ui;
use crate::core::currency::{Currency, CurrencyProvider};
use anyhow::Result;
use comfy_table::{Cell, Table};

pub fn currencies_table(currencies: &[Currency]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
        ui::header_cell("Decimals"),
    ]);

    let mut sorted: Vec<&Currency> = currencies.iter().collect();
    sorted.sort_by_key(|c| c.code.to_uppercase());
    for currency in sorted {
        table.add_row(vec![
            Cell::new(currency.code.to_uppercase()),
            Cell::new(&currency.name),
            Cell::new(currency.symbol.as_deref().unwrap_or("-")),
            ui::amount_cell(currency.minor_unit().to_string()),
        ]);
    }
    table
}

pub async fn run(provider: &dyn CurrencyProvider) -> Result<()> {
    let pb = ui::new_spinner("Fetching currencies...");
    let result = provider.list_currencies().await;
    pb.finish_and_clear();
    let currencies = result?;

    if currencies.is_empty() {
        println!("No currencies configured.");
        return Ok(());
    }

    println!("{}", ui::style_text("Currencies", ui::StyleType::Title));
    println!("{}", currencies_table(&currencies));
    Ok(())
}
