//! Connectivity probing
//!
//! A probe is one minimal read against the slave's configured ping address,
//! issued under the shared transport lock. The outcome is translated into a
//! status only; transport errors never escape to the caller.

use crate::config::PingType;
use crate::registry::SlaveStatus;

impl super::SlavePoller {
    /// Probe the slave and record the resulting status. A failed ping also
    /// requests a connection-health recheck from the supervisor.
    pub(crate) async fn probe(&mut self) {
        let status = {
            let mut transport = self.transport.lock().await;
            if !transport.is_connected() {
                SlaveStatus::ConnDown
            } else {
                let outcome = match self.ping_type {
                    PingType::Holding => transport
                        .read_holding_registers(self.slave_id, self.ping_register, 1)
                        .await
                        .map(|_| ()),
                    PingType::Input => transport
                        .read_input_registers(self.slave_id, self.ping_register, 1)
                        .await
                        .map(|_| ()),
                };
                match outcome {
                    Ok(()) => SlaveStatus::Ready,
                    Err(e) => {
                        self.logger
                            .debug(&format!("error during device ping: {}", e));
                        SlaveStatus::PingFailed
                    }
                }
            }
        };

        // A failed ping or a missing transport both warrant a health recheck;
        // reinitialization after an outage is driven by the supervisor.
        if status != SlaveStatus::Ready {
            let _ = self.health_tx.send(());
        }
        self.set_status(status).await;
    }
}
