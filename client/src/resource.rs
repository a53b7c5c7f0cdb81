use vrl_common::entities::{
    Entity, Singleton, event::Event, home::HomeContent, journal::JournalArticle,
    journal::JournalContent, publication::Publication, staff::Staff,
};

/// An entity served under `/api/<PATH>` and `/api/<PATH>/{id}`.
pub trait Resource: Entity {
    const PATH: &'static str;
}

impl Resource for Event {
    const PATH: &'static str = "events";
}

impl Resource for Publication {
    const PATH: &'static str = "publications";
}

impl Resource for Staff {
    const PATH: &'static str = "staffs";
}

impl Resource for JournalArticle {
    const PATH: &'static str = "journal-articles";
}

/// A singleton served under `/api/<PATH>`.
pub trait SingletonResource: Singleton {
    const PATH: &'static str;
}

impl SingletonResource for HomeContent {
    const PATH: &'static str = "home-content";
}

impl SingletonResource for JournalContent {
    const PATH: &'static str = "journal-content";
}
