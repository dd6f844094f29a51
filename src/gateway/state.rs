//! Shared application state, following `gateway::state::AppState`'s
//! `Arc`-of-collaborators shape.

use std::sync::Arc;

use crate::core::{AdminOps, AdmissionPipeline, DurableOrderLog, FastCoordinator};

#[derive(Clone)]
pub struct AppState<C: FastCoordinator, D: DurableOrderLog> {
    pub pipeline: Arc<AdmissionPipeline<C, D>>,
    pub admin: Arc<AdminOps<C, D>>,
    pub fc: Arc<C>,
    pub dol: Arc<D>,
    pub default_sale_id: String,
}

impl<C: FastCoordinator, D: DurableOrderLog> AppState<C, D> {
    pub fn new(fc: Arc<C>, dol: Arc<D>, default_sale_id: String) -> Self {
        Self {
            pipeline: Arc::new(AdmissionPipeline::new(fc.clone(), dol.clone())),
            admin: Arc::new(AdminOps::new(fc.clone(), dol.clone())),
            fc,
            dol,
            default_sale_id,
        }
    }
}
