//! Poll cycle execution
//!
//! One cycle gathers the working set (subscribed points with resolvable
//! locators), reads it through the shared transport lock as one batched plan
//! or one read per point, and routes raw results through the decoder and
//! the change-suppression policy into the registry. Transport failures turn
//! into a re-probe plus the optional zero fallback; they never abort the
//! poller task itself.

use std::time::Instant;

use crate::config::PointType;
use crate::error::{ArgusError, Result};
use crate::registry::SlaveStatus;

use super::batch::{self, BatchEntry, ReadSpan};
use super::decode::{self, RawValue};
use super::locator::{self, Locator, RegisterEncoding};
use super::suppress;
use super::transport_like::ModbusTransport;

/// Outcome of executing a batch plan under the transport lock
enum BatchOutcome {
    /// Raw results per working-set entry
    Read(Vec<Option<RawValue>>),
    /// Transport or protocol failure; no raw data exists
    Failed(ArgusError),
    /// Transport not established
    ConnDown,
}

impl super::SlavePoller {
    /// Execute one poll cycle for this slave
    pub(crate) async fn poll_cycle(&mut self) {
        if self.none_subscribed() {
            return;
        }

        if self.status != SlaveStatus::Ready {
            self.probe().await;
            if self.status != SlaveStatus::Ready {
                return;
            }
        }

        // Points without a configured offset are silently skipped
        let entries: Vec<BatchEntry> = self
            .subscribed
            .values()
            .filter_map(|point| {
                locator::build_locator(point).map(|locator| BatchEntry {
                    point: point.name.clone(),
                    locator,
                })
            })
            .collect();
        if entries.is_empty() {
            return;
        }

        if self.use_batch_polling {
            self.read_points_batched(entries).await;
        } else {
            self.read_points_individually(entries).await;
        }
    }

    /// Batched strategy: the whole plan is issued under one lock hold
    async fn read_points_batched(&mut self, entries: Vec<BatchEntry>) {
        let plan = batch::assemble(&entries, self.contiguous_batch_requests_only);

        let outcome = {
            let mut transport = self.transport.lock().await;
            if !transport.is_connected() {
                BatchOutcome::ConnDown
            } else {
                Self::execute_plan(&mut **transport, self.slave_id, &entries, &plan).await
            }
        };

        match outcome {
            BatchOutcome::ConnDown => {
                self.set_status(SlaveStatus::ConnDown).await;
            }
            BatchOutcome::Failed(e) => {
                self.logger.warn(&format!("error during batch poll: {}", e));
                self.probe().await;
                if self.zero_on_failed_poll {
                    self.apply_fallback(&entries).await;
                }
            }
            BatchOutcome::Read(raw) => {
                for (entry, raw) in entries.iter().zip(raw) {
                    if let Some(raw) = raw {
                        self.update_value(&entry.point, raw).await;
                    }
                }
            }
        }
    }

    /// Run every span of the plan; a device exception response is carried
    /// into the affected entries' raw results, a transport failure aborts
    /// the whole batch.
    async fn execute_plan(
        transport: &mut dyn ModbusTransport,
        slave_id: u8,
        entries: &[BatchEntry],
        plan: &[ReadSpan],
    ) -> BatchOutcome {
        let mut raw: Vec<Option<RawValue>> = vec![None; entries.len()];

        for span in plan {
            match span.range {
                PointType::Coil | PointType::Discrete => {
                    let result = if span.range == PointType::Coil {
                        transport.read_coils(slave_id, span.start, span.count).await
                    } else {
                        transport
                            .read_discrete_inputs(slave_id, span.start, span.count)
                            .await
                    };
                    match result {
                        Ok(bits) => {
                            for &i in &span.entries {
                                let idx = (entries[i].locator.offset - span.start) as usize;
                                raw[i] = Some(match bits.get(idx) {
                                    Some(&b) => RawValue::Bool(b),
                                    None => RawValue::Exception("short response".to_string()),
                                });
                            }
                        }
                        Err(ArgusError::Exception { message }) => {
                            for &i in &span.entries {
                                raw[i] = Some(RawValue::Exception(message.clone()));
                            }
                        }
                        Err(e) => return BatchOutcome::Failed(e),
                    }
                }
                PointType::Holding | PointType::Input => {
                    let result = if span.range == PointType::Holding {
                        transport
                            .read_holding_registers(slave_id, span.start, span.count)
                            .await
                    } else {
                        transport
                            .read_input_registers(slave_id, span.start, span.count)
                            .await
                    };
                    match result {
                        Ok(words) => {
                            for &i in &span.entries {
                                raw[i] = Some(Self::slice_raw(&entries[i].locator, span.start, &words));
                            }
                        }
                        Err(ArgusError::Exception { message }) => {
                            for &i in &span.entries {
                                raw[i] = Some(RawValue::Exception(message.clone()));
                            }
                        }
                        Err(e) => return BatchOutcome::Failed(e),
                    }
                }
            }
        }

        BatchOutcome::Read(raw)
    }

    /// Cut one entry's registers out of a span result and decode them to a
    /// raw transport value
    fn slice_raw(locator: &Locator, span_start: u16, words: &[u16]) -> RawValue {
        let begin = (locator.offset - span_start) as usize;
        let end = begin + locator.count as usize;
        let Some(slice) = words.get(begin..end) else {
            return RawValue::Exception("short response".to_string());
        };

        // Bit-in-word point: extract the configured bit
        if locator.encoding == RegisterEncoding::Binary {
            let bit = locator.bit.unwrap_or(0);
            return RawValue::Bool((slice[0] >> bit) & 1 == 1);
        }

        match locator.encoding.decode_words(slice) {
            Ok(raw) => raw,
            Err(e) => RawValue::Exception(e.to_string()),
        }
    }

    /// Individual strategy: one read per point, failures isolated per point
    async fn read_points_individually(&mut self, entries: Vec<BatchEntry>) {
        for entry in &entries {
            let outcome = {
                let mut transport = self.transport.lock().await;
                if !transport.is_connected() {
                    None
                } else {
                    Some(Self::read_single(&mut **transport, self.slave_id, &entry.locator).await)
                }
            };

            let Some(result) = outcome else {
                self.set_status(SlaveStatus::ConnDown).await;
                return;
            };

            match result {
                Ok(raw) => self.update_value(&entry.point, raw).await,
                Err(e) => {
                    self.logger.warn(&format!("error during poll: {}", e));
                    self.probe().await;
                    if self.zero_on_failed_poll {
                        self.apply_fallback(std::slice::from_ref(entry)).await;
                    }
                    // The rest of the working set still reads unless the
                    // transport itself went away
                    if self.status == SlaveStatus::ConnDown {
                        return;
                    }
                }
            }
        }
    }

    /// One transport read for a single locator
    async fn read_single(
        transport: &mut dyn ModbusTransport,
        slave_id: u8,
        locator: &Locator,
    ) -> Result<RawValue> {
        match locator.range {
            PointType::Coil => {
                let bits = transport.read_coils(slave_id, locator.offset, 1).await?;
                Ok(RawValue::Bool(bits.first().copied().unwrap_or(false)))
            }
            PointType::Discrete => {
                let bits = transport
                    .read_discrete_inputs(slave_id, locator.offset, 1)
                    .await?;
                Ok(RawValue::Bool(bits.first().copied().unwrap_or(false)))
            }
            PointType::Holding | PointType::Input => {
                let words = if locator.range == PointType::Holding {
                    transport
                        .read_holding_registers(slave_id, locator.offset, locator.count)
                        .await?
                } else {
                    transport
                        .read_input_registers(slave_id, locator.offset, locator.count)
                        .await?
                };
                if locator.encoding == RegisterEncoding::Binary {
                    let bit = locator.bit.unwrap_or(0);
                    let word = words.first().copied().unwrap_or(0);
                    return Ok(RawValue::Bool((word >> bit) & 1 == 1));
                }
                locator.encoding.decode_words(&words)
            }
        }
    }

    /// Substitute type-appropriate zeros for points whose poll failed,
    /// bypassing the decoder (no raw data exists)
    pub(crate) async fn apply_fallback(&mut self, entries: &[BatchEntry]) {
        for entry in entries {
            let Some(kind) = self.point_kinds.get(&entry.point).copied() else {
                continue;
            };
            if let Some(zero) = decode::fallback_zero(kind) {
                self.registry
                    .update_value(&self.name, &entry.point, zero.clone())
                    .await;
                self.last_values.insert(entry.point.clone(), zero);
            }
        }
    }

    /// Decode a raw result and publish it through the suppression policy
    pub(crate) async fn update_value(&mut self, point: &str, raw: RawValue) {
        let Some(config) = self.subscribed.get(point) else {
            return;
        };
        let (data_type, scaling, scaling_offset) =
            (config.data_type, config.scaling, config.scaling_offset);

        let decoded = match decode::decode(data_type, scaling, scaling_offset, raw) {
            Ok(value) => value,
            Err(e) => {
                self.logger.error(&format!("{}: {}", point, e));
                None
            }
        };

        let current_kind = self
            .point_kinds
            .get(point)
            .copied()
            .unwrap_or_else(|| decode::default_kind(data_type));

        let value = match decoded {
            Some(value) => value,
            None => {
                if !self.zero_on_failed_poll {
                    return;
                }
                match decode::fallback_zero(current_kind) {
                    Some(zero) => zero,
                    None => return,
                }
            }
        };

        // A kind change forces a representation update ahead of the value
        let kind = value.kind();
        if kind != current_kind {
            self.registry.update_value_kind(&self.name, point, kind).await;
        }
        self.point_kinds.insert(point.to_string(), kind);

        if suppress::should_publish(
            &value,
            self.last_values.get(point),
            self.last_updates.get(point).copied(),
            self.suppress_non_cov_duration,
        ) {
            self.registry
                .update_value(&self.name, point, value.clone())
                .await;
            self.last_values.insert(point.to_string(), value);
            self.last_updates.insert(point.to_string(), Instant::now());
        }
    }
}
