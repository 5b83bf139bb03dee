use crate::{Error, Mapper, Record, Result};
use std::{
    any::{self, TypeId},
    collections::HashMap,
    sync::{LazyLock, RwLock},
};

#[derive(Default)]
struct State {
    frozen: bool,
    mappers: Vec<Mapper>,
    by_type: HashMap<TypeId, Vec<Mapper>>,
}

/// Mappers known to the process, looked up by the record types they manage.
///
/// Filled once at startup, then frozen: registering after [`Registry::freeze`] fails.
#[derive(Default)]
pub struct Registry {
    state: RwLock<State>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub(crate) fn register(&self, mapper: Mapper) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| Error::configuration("the mapper registry lock is poisoned"))?;
        if state.frozen {
            return Err(Error::configuration(format!(
                "cannot register mapper `{}`, the registry is frozen",
                mapper.name()
            )));
        }
        if state.mappers.iter().any(|m| m.name() == mapper.name()) {
            return Err(Error::configuration(format!(
                "a mapper named `{}` is already registered",
                mapper.name()
            )));
        }
        if !mapper.is_abstract() {
            for managed in mapper.managed() {
                let clash = state.by_type.get(&managed.id).and_then(|mappers| {
                    mappers
                        .iter()
                        .find(|m| !m.is_abstract() && m.table() == mapper.table())
                });
                if let Some(clash) = clash {
                    return Err(Error::configuration(format!(
                        "{} is already managed by mapper `{}` on table `{}`",
                        managed.name,
                        clash.name(),
                        clash.table().unwrap_or_default(),
                    )));
                }
            }
        }
        for managed in mapper.managed() {
            state
                .by_type
                .entry(managed.id)
                .or_default()
                .push(mapper.clone());
        }
        log::debug!("Registered mapper `{}`", mapper.name());
        state.mappers.push(mapper);
        Ok(())
    }

    /// Refuse any further registration.
    pub fn freeze(&self) {
        match self.state.write() {
            Ok(mut state) => state.frozen = true,
            Err(e) => e.into_inner().frozen = true,
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self.state.read() {
            Ok(state) => state.frozen,
            Err(e) => e.into_inner().frozen,
        }
    }

    pub fn mapper(&self, name: &str) -> Option<Mapper> {
        let state = self.state.read().ok()?;
        state.mappers.iter().find(|m| m.name() == name).cloned()
    }

    /// Every mapper managing `R`, in registration order.
    pub fn mappers_for<R: Record>(&self) -> Vec<Mapper> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.by_type.get(&TypeId::of::<R>()).cloned())
            .unwrap_or_default()
    }

    /// The first non abstract mapper managing `R`.
    pub fn mapper_for<R: Record>(&self) -> Result<Mapper> {
        self.mappers_for::<R>()
            .into_iter()
            .find(|m| !m.is_abstract())
            .ok_or_else(|| {
                Error::validation(format!(
                    "no concrete mapper manages {}",
                    any::type_name::<R>()
                ))
            })
    }
}
