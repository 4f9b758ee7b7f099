// Static definition of the well-known SGS series
use crate::domain::catalog::{CatalogEntry, Periodicity};

pub fn default_entries() -> Vec<CatalogEntry> {
    use Periodicity::{Daily, Monthly, Weekly};

    vec![
        CatalogEntry::new(
            1,
            "Dollar (buy)",
            "Exchange rate - US dollar (buy) - PTAX",
            Daily,
            "BRL/USD",
            &["dolar", "usd", "ptax", "cambio"],
        ),
        CatalogEntry::new(
            11,
            "Selic daily",
            "Daily Selic interest rate",
            Daily,
            "% p.y.",
            &["selic", "selic_diaria"],
        ),
        CatalogEntry::new(
            12,
            "Selic accumulated in month",
            "Selic rate accumulated in the month",
            Monthly,
            "% p.m.",
            &["selic_mensal", "selic_acumulada"],
        ),
        CatalogEntry::new(
            433,
            "IPCA",
            "IPCA - monthly change",
            Monthly,
            "% p.m.",
            &["ipca", "inflacao"],
        ),
        CatalogEntry::new(
            4189,
            "Household loan rates",
            "Average interest rate - households",
            Monthly,
            "% p.y.",
            &["juros_pf", "taxa_pf"],
        ),
        CatalogEntry::new(
            4390,
            "Selic annualized",
            "Selic rate accumulated in the month, annualized",
            Monthly,
            "% p.y.",
            &["selic_anual", "selic_anualizada"],
        ),
        CatalogEntry::new(
            7326,
            "International reserves",
            "International reserves - liquidity concept",
            Daily,
            "USD millions",
            &["reservas", "reservas_internacionais"],
        ),
        CatalogEntry::new(
            10813,
            "Euro (buy)",
            "Exchange rate - Euro (buy)",
            Daily,
            "BRL/EUR",
            &["euro", "eur"],
        ),
        CatalogEntry::new(
            20542,
            "Free credit balance",
            "Credit portfolio balance with free resources - total",
            Monthly,
            "BRL millions",
            &["saldo_credito", "carteira_credito"],
        ),
        CatalogEntry::new(
            21082,
            "Corporate delinquency",
            "Credit portfolio delinquency - companies",
            Monthly,
            "%",
            &["inadimplencia_pj", "default_pj"],
        ),
        CatalogEntry::new(
            21112,
            "Household delinquency",
            "Credit portfolio delinquency - households",
            Monthly,
            "%",
            &["inadimplencia_pf", "default_pf"],
        ),
        CatalogEntry::new(
            25434,
            "Free credit rates",
            "Average interest rate - free credit total",
            Monthly,
            "% p.y.",
            &["juros_credito", "credito_livre"],
        ),
        CatalogEntry::new(
            27574,
            "IPCA 12m expectation",
            "Median IPCA expectation for the next 12 months (Focus)",
            Weekly,
            "% p.y.",
            &["focus_ipca", "expectativa_ipca"],
        ),
        CatalogEntry::new(
            27575,
            "Selic expectation",
            "Median Selic rate expectation (Focus)",
            Weekly,
            "% p.y.",
            &["focus_selic", "expectativa_selic"],
        ),
    ]
}
