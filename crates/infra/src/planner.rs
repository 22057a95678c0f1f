//! Async fulfillment planner service.
//!
//! Gathers availability and rate quotes, runs the pure planning algorithms
//! under the configured deadline, then persists the finished plan. Only the
//! decision phase is bounded; a stored plan is never rolled back.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use wareledger_core::{
    Clock, DomainError, DomainResult, OrderId, PlanId, ShipmentId, SystemClock, WarehouseId,
};
use wareledger_fulfillment::{
    AvailabilityMatrix, Destination, OrderItem, PartialPlan, PlanningInput, RateTable,
    ShipmentPlan, ShipmentStatus, SplitConfig, SplitStrategy, plan_partial, single_warehouse_for,
    validate_items,
};

use crate::collaborators::{RateProvider, StockAvailability, WarehouseDirectory};
use crate::store::RecordStore;

/// Approver recorded on plans that skip manual approval.
pub const SYSTEM_APPROVER: &str = "system";

pub struct FulfillmentPlanner<A, D, R, P, C = SystemClock> {
    stock: A,
    directory: D,
    rates: R,
    plans: P,
    clock: C,
    config: SplitConfig,
}

impl<A, D, R, P, C> FulfillmentPlanner<A, D, R, P, C>
where
    A: StockAvailability,
    D: WarehouseDirectory,
    R: RateProvider,
    P: RecordStore<ShipmentPlan>,
    C: Clock,
{
    pub fn new(stock: A, directory: D, rates: R, plans: P, clock: C, config: SplitConfig) -> Self {
        Self {
            stock,
            directory,
            rates,
            plans,
            clock,
            config: config.normalized(),
        }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Plan an order with one strategy and store the result.
    pub async fn plan_shipment(
        &self,
        order_id: OrderId,
        items: &[OrderItem],
        destination: Destination,
        strategy: SplitStrategy,
    ) -> DomainResult<ShipmentPlan> {
        let plan = self
            .bounded(async {
                validate_items(items)?;
                let (availability, rates) = self.gather(items, destination).await?;
                let input = self.input(order_id, items, &availability, &rates);
                wareledger_fulfillment::plan_shipment(input, strategy, &self.config)
            })
            .await;

        match plan {
            Ok(plan) => self.commit(plan),
            Err(err) => {
                if err.is_business_outcome() {
                    warn!(order = %order_id, strategy = %strategy, error = %err, "order could not be planned");
                }
                Err(err)
            }
        }
    }

    /// Ship what can be shipped now and backorder the rest.
    ///
    /// A fully backordered order is a normal result: no plan, every line
    /// returned as backordered.
    pub async fn calculate_partial_shipment(
        &self,
        order_id: OrderId,
        items: &[OrderItem],
        destination: Destination,
    ) -> DomainResult<PartialPlan> {
        let partial = self
            .bounded(async {
                validate_items(items)?;
                let (availability, rates) = self.gather(items, destination).await?;
                plan_partial(self.input(order_id, items, &availability, &rates), &self.config)
            })
            .await?;

        let PartialPlan { plan, backordered } = partial;
        if !backordered.is_empty() {
            info!(
                order = %order_id,
                backordered_lines = backordered.len(),
                fully_backordered = plan.is_none(),
                "order partially backordered"
            );
        }
        let plan = plan.map(|p| self.commit(p)).transpose()?;
        Ok(PartialPlan { plan, backordered })
    }

    /// One candidate plan per offered strategy that can serve the order.
    ///
    /// Options are quotes and are not stored; plan the chosen strategy with
    /// `plan_shipment` to keep it. Fails `NoAvailableStock` when no strategy works.
    pub async fn get_shipment_options(
        &self,
        order_id: OrderId,
        items: &[OrderItem],
        destination: Destination,
    ) -> DomainResult<Vec<ShipmentPlan>> {
        self.bounded(async {
            validate_items(items)?;
            let (availability, rates) = self.gather(items, destination).await?;
            let input = self.input(order_id, items, &availability, &rates);

            let options: Vec<ShipmentPlan> = SplitStrategy::OPTIONS
                .into_iter()
                .filter_map(|strategy| {
                    wareledger_fulfillment::plan_shipment(input, strategy, &self.config)
                        .inspect_err(|err| debug!(strategy = %strategy, error = %err, "strategy skipped"))
                        .ok()
                })
                .collect();

            if options.is_empty() {
                return Err(DomainError::NoAvailableStock);
            }
            Ok(options)
        })
        .await
    }

    pub fn approve_shipment_plan(&self, plan_id: PlanId, approved_by: &str) -> DomainResult<ShipmentPlan> {
        let now = self.clock.now();
        let plan = self
            .plans
            .update(&plan_id, |plan| {
                plan.approve(approved_by, now);
                Ok(plan.clone())
            })?
            .ok_or(DomainError::PlanNotFound(plan_id))?;

        info!(plan = %plan.id, order = %plan.order_id, approved_by = ?plan.approved_by, "shipment plan approved");
        Ok(plan)
    }

    /// Advance one shipment of a plan by a single step.
    pub fn update_shipment_status(
        &self,
        plan_id: PlanId,
        shipment_id: ShipmentId,
        status: ShipmentStatus,
        tracking_number: Option<String>,
    ) -> DomainResult<ShipmentPlan> {
        let now = self.clock.now();
        let plan = self
            .plans
            .update(&plan_id, |plan| {
                plan.update_shipment_status(shipment_id, status, tracking_number, now)?;
                Ok(plan.clone())
            })?
            .ok_or(DomainError::PlanNotFound(plan_id))?;

        debug!(plan = %plan_id, shipment = %shipment_id, status = status.as_str(), "shipment status updated");
        Ok(plan)
    }

    /// Display name of a warehouse able to ship the whole order alone.
    ///
    /// Falls back to the warehouse id when the directory cannot name it.
    pub fn can_ship_from_single_warehouse(&self, items: &[OrderItem]) -> DomainResult<Option<String>> {
        if items.is_empty() {
            return Ok(None);
        }
        let availability = self.availability(items)?;
        let Some(warehouse_id) = single_warehouse_for(items, &availability) else {
            return Ok(None);
        };

        let name = match self.directory.warehouse(warehouse_id) {
            Ok(Some(warehouse)) if !warehouse.name.is_empty() => warehouse.name,
            _ => warehouse_id.to_string(),
        };
        Ok(Some(name))
    }

    /// Merge shipments of a plan that could travel together.
    ///
    /// No merge rule is defined yet; the stored plan is returned unchanged.
    pub fn consolidate_shipments(&self, plan_id: PlanId) -> DomainResult<ShipmentPlan> {
        self.get_shipment_plan(plan_id)
    }

    pub fn get_shipment_plan(&self, plan_id: PlanId) -> DomainResult<ShipmentPlan> {
        self.plans
            .get(&plan_id)?
            .ok_or(DomainError::PlanNotFound(plan_id))
    }

    /// Most recent plan stored for an order.
    pub fn get_shipment_plan_by_order(&self, order_id: OrderId) -> DomainResult<Option<ShipmentPlan>> {
        Ok(self
            .plans
            .find(&|p| p.order_id == order_id)?
            .into_iter()
            .max_by_key(|p| (p.created_at, p.id)))
    }

    async fn bounded<T>(&self, decision: impl Future<Output = DomainResult<T>>) -> DomainResult<T> {
        let deadline = Duration::from_millis(self.config.planning_timeout_ms);
        tokio::time::timeout(deadline, decision)
            .await
            .map_err(|_| DomainError::DeadlineExceeded)?
    }

    async fn gather(
        &self,
        items: &[OrderItem],
        destination: Destination,
    ) -> DomainResult<(AvailabilityMatrix, RateTable)> {
        let rates: RateTable = self.rates.warehouse_rates(destination).await?.into_iter().collect();
        let availability = self.availability(items)?;
        Ok((availability, rates))
    }

    /// Availability of the order's products in warehouses that take orders.
    fn availability(&self, items: &[OrderItem]) -> DomainResult<AvailabilityMatrix> {
        let open: HashSet<WarehouseId> = self
            .directory
            .warehouses()?
            .into_iter()
            .filter(|w| w.can_fulfill_orders())
            .map(|w| w.id)
            .collect();

        let products: BTreeSet<_> = items.iter().map(|i| i.product_id).collect();
        let mut rows = Vec::new();
        for product_id in products {
            rows.extend(
                self.stock
                    .stock_by_product(product_id)?
                    .into_iter()
                    .filter(|s| open.contains(&s.warehouse_id)),
            );
        }
        Ok(AvailabilityMatrix::from_stock(&rows))
    }

    fn input<'a>(
        &self,
        order_id: OrderId,
        items: &'a [OrderItem],
        availability: &'a AvailabilityMatrix,
        rates: &'a RateTable,
    ) -> PlanningInput<'a> {
        PlanningInput {
            order_id,
            items,
            availability,
            rates,
            now: self.clock.now(),
        }
    }

    fn commit(&self, mut plan: ShipmentPlan) -> DomainResult<ShipmentPlan> {
        if !self.config.require_approval {
            plan.approve(SYSTEM_APPROVER, self.clock.now());
        }
        self.plans.upsert(plan.clone())?;

        info!(
            plan = %plan.id,
            order = %plan.order_id,
            strategy = %plan.strategy,
            shipments = plan.shipments.len(),
            total_cost = plan.total_cost,
            estimated_days = plan.estimated_days,
            is_split = plan.is_split,
            "shipment plan created"
        );
        if plan.is_split && self.config.notify_customer {
            info!(
                order = %plan.order_id,
                plan = %plan.id,
                shipments = plan.shipments.len(),
                "customer notification: order ships in several parcels"
            );
        }
        Ok(plan)
    }
}
