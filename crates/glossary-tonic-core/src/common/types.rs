//! # Shared Defaults and Seed Data
//!
//! Constants both the server and the load-test client agree on: where the
//! service listens by default, how large a page is when the client does not
//! say, and which terms every fresh database starts with.

/// Port the server listens on when `GRPC_PORT` is unset.
pub const DEFAULT_PORT: u16 = 50051;

/// Page size used by `ListTerms` when the request carries `limit = 0`.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Location of the SQLite database when `DB_PATH` is unset.
pub const DEFAULT_DB_PATH: &str = "/data/glossary.db";

/// A glossary entry inserted on first start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedTerm {
    pub keyword: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// Terms present in every initialised database.
///
/// Seeding never overwrites a row that already exists, so edits made through
/// `AddTerm` survive restarts.
pub const SEED_TERMS: [SeedTerm; 4] = [
    SeedTerm {
        keyword: "ast",
        title: "Абстрактное синтаксическое дерево (AST)",
        description: "Структурное дерево исходного кода, используемое при анализе программ.",
    },
    SeedTerm {
        keyword: "gof",
        title: "Паттерны GoF",
        description: "Классические шаблоны проектирования, рассматриваемые в ВКР.",
    },
    SeedTerm {
        keyword: "observer",
        title: "Наблюдатель",
        description: "Поведенческий паттерн, реализующий подписку на события.",
    },
    SeedTerm {
        keyword: "grpc",
        title: "gRPC",
        description: "Фреймворк удалённого вызова процедур, основанный на HTTP/2 и Protobuf.",
    },
];
