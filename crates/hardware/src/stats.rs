//! Controller statistics collection and reporting.
//!
//! This module tracks what a memory controller did. It provides:
//! 1. **Row buffer:** Hit, miss, and conflict counts for first commands, overall and per core.
//! 2. **Commands:** Issued reads, writes, activates, and refreshes.
//! 3. **Defense:** Useless activates, preventive activates (issued and dropped), and
//!    target-row refreshes.
//! 4. **Latency and queues:** Read latency, queue occupancy sums, and their averages.

use serde::Serialize;

use crate::common::Clock;

/// Row-buffer outcome of a request's first command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOutcome {
    /// The target row was already open.
    Hit,
    /// The row buffer was closed.
    Miss,
    /// Another row was open.
    Conflict,
}

/// Per-core counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CoreStats {
    /// Read row hits.
    pub read_row_hits: u64,
    /// Read row misses.
    pub read_row_misses: u64,
    /// Read row conflicts.
    pub read_row_conflicts: u64,
    /// Write row hits.
    pub write_row_hits: u64,
    /// Write row misses.
    pub write_row_misses: u64,
    /// Write row conflicts.
    pub write_row_conflicts: u64,
    /// Sum of read latencies in cycles.
    pub read_latency_sum: u64,
    /// Reads that returned data.
    pub reads_served: u64,
}

impl CoreStats {
    /// Records the row outcome of a read (`is_read`) or write.
    pub fn record(&mut self, is_read: bool, outcome: RowOutcome) {
        let counter = match (is_read, outcome) {
            (true, RowOutcome::Hit) => &mut self.read_row_hits,
            (true, RowOutcome::Miss) => &mut self.read_row_misses,
            (true, RowOutcome::Conflict) => &mut self.read_row_conflicts,
            (false, RowOutcome::Hit) => &mut self.write_row_hits,
            (false, RowOutcome::Miss) => &mut self.write_row_misses,
            (false, RowOutcome::Conflict) => &mut self.write_row_conflicts,
        };
        *counter += 1;
    }

    fn merge(&mut self, other: &Self) {
        self.read_row_hits += other.read_row_hits;
        self.read_row_misses += other.read_row_misses;
        self.read_row_conflicts += other.read_row_conflicts;
        self.write_row_hits += other.write_row_hits;
        self.write_row_misses += other.write_row_misses;
        self.write_row_conflicts += other.write_row_conflicts;
        self.read_latency_sum += other.read_latency_sum;
        self.reads_served += other.reads_served;
    }
}

/// Counters for one controller, or several merged.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ControllerStats {
    /// Controller cycles elapsed.
    pub cycles: u64,
    /// First commands that hit an open row.
    pub row_hits: u64,
    /// First commands to a closed row buffer.
    pub row_misses: u64,
    /// First commands that found another row open.
    pub row_conflicts: u64,
    /// Final read commands issued.
    pub issued_reads: u64,
    /// Final write commands issued.
    pub issued_writes: u64,
    /// Activates issued.
    pub activates: u64,
    /// Refreshes issued.
    pub refreshes: u64,
    /// Precharges that closed a row no access ever hit.
    pub useless_activates: u64,
    /// Preventive activates enqueued for the defense.
    pub preventive_activates: u64,
    /// Preventive activates dropped because the queue was full.
    pub preventive_dropped: u64,
    /// Extra target-row refreshes the defense performed alongside refreshes.
    pub trr_refreshes: u64,
    /// Reads served directly from a queued write.
    pub coalesced_reads: u64,
    /// Sum of read latencies in cycles.
    pub read_latency_sum: u64,
    /// Reads that returned data.
    pub reads_served: u64,
    /// Per-cycle sum of read-queue occupancy.
    pub readq_len_sum: u64,
    /// Per-cycle sum of write-queue occupancy.
    pub writeq_len_sum: u64,
    /// Per-cycle sum of pending-read occupancy.
    pub pending_len_sum: u64,
    /// Largest read-queue occupancy seen.
    pub readq_len_max: usize,
    /// Largest write-queue occupancy seen.
    pub writeq_len_max: usize,
    /// Mean read latency (computed by [`finalize`](Self::finalize)).
    pub avg_read_latency: f64,
    /// Mean read-queue occupancy (computed by [`finalize`](Self::finalize)).
    pub avg_readq_len: f64,
    /// Mean write-queue occupancy (computed by [`finalize`](Self::finalize)).
    pub avg_writeq_len: f64,
    /// Per-core counters, indexed by core id.
    pub cores: Vec<CoreStats>,
}

impl ControllerStats {
    /// Counters for `core`, growing the table on demand.
    pub fn core_mut(&mut self, core: usize) -> &mut CoreStats {
        if core >= self.cores.len() {
            self.cores.resize(core + 1, CoreStats::default());
        }
        &mut self.cores[core]
    }

    /// Records the row-buffer outcome of a request's first command.
    pub fn record_row(&mut self, core: usize, is_read: bool, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Hit => self.row_hits += 1,
            RowOutcome::Miss => self.row_misses += 1,
            RowOutcome::Conflict => self.row_conflicts += 1,
        }
        self.core_mut(core).record(is_read, outcome);
    }

    /// Records a read that returned data after `latency` cycles.
    pub fn record_read(&mut self, core: usize, latency: Clock) {
        let latency = latency.max(0) as u64;
        self.read_latency_sum += latency;
        self.reads_served += 1;
        let per_core = self.core_mut(core);
        per_core.read_latency_sum += latency;
        per_core.reads_served += 1;
    }

    /// Samples queue occupancy for one cycle.
    pub fn sample_queues(&mut self, readq: usize, writeq: usize, pending: usize) {
        self.cycles += 1;
        self.readq_len_sum += readq as u64;
        self.writeq_len_sum += writeq as u64;
        self.pending_len_sum += pending as u64;
        self.readq_len_max = self.readq_len_max.max(readq);
        self.writeq_len_max = self.writeq_len_max.max(writeq);
    }

    /// Adds another controller's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.cycles = self.cycles.max(other.cycles);
        self.row_hits += other.row_hits;
        self.row_misses += other.row_misses;
        self.row_conflicts += other.row_conflicts;
        self.issued_reads += other.issued_reads;
        self.issued_writes += other.issued_writes;
        self.activates += other.activates;
        self.refreshes += other.refreshes;
        self.useless_activates += other.useless_activates;
        self.preventive_activates += other.preventive_activates;
        self.preventive_dropped += other.preventive_dropped;
        self.trr_refreshes += other.trr_refreshes;
        self.coalesced_reads += other.coalesced_reads;
        self.read_latency_sum += other.read_latency_sum;
        self.reads_served += other.reads_served;
        self.readq_len_sum += other.readq_len_sum;
        self.writeq_len_sum += other.writeq_len_sum;
        self.pending_len_sum += other.pending_len_sum;
        self.readq_len_max = self.readq_len_max.max(other.readq_len_max);
        self.writeq_len_max = self.writeq_len_max.max(other.writeq_len_max);
        for (core, theirs) in other.cores.iter().enumerate() {
            self.core_mut(core).merge(theirs);
        }
    }

    /// Computes the averages from the accumulated sums.
    pub fn finalize(&mut self) {
        let ratio = |sum: u64, n: u64| if n == 0 { 0.0 } else { sum as f64 / n as f64 };
        self.avg_read_latency = ratio(self.read_latency_sum, self.reads_served);
        self.avg_readq_len = ratio(self.readq_len_sum, self.cycles);
        self.avg_writeq_len = ratio(self.writeq_len_sum, self.cycles);
    }

    /// Row-buffer hit rate over all first commands.
    pub fn row_hit_rate(&self) -> f64 {
        let total = self.row_hits + self.row_misses + self.row_conflicts;
        if total == 0 {
            0.0
        } else {
            self.row_hits as f64 / total as f64
        }
    }

    /// Prints the requested report sections (all when empty).
    ///
    /// Known sections: `summary`, `rows`, `defense`, `cores`.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            println!("\n==========================================================");
            println!("DRAM CONTROLLER STATISTICS");
            println!("==========================================================");
            println!("sim_cycles               {}", self.cycles);
            println!("issued_reads             {}", self.issued_reads);
            println!("issued_writes            {}", self.issued_writes);
            println!("activates                {}", self.activates);
            println!("refreshes                {}", self.refreshes);
            println!("coalesced_reads          {}", self.coalesced_reads);
            println!("avg_read_latency         {:.2}", self.avg_read_latency);
            println!("avg_readq_len            {:.2}", self.avg_readq_len);
            println!("avg_writeq_len           {:.2}", self.avg_writeq_len);
            println!("max_readq_len            {}", self.readq_len_max);
            println!("max_writeq_len           {}", self.writeq_len_max);
            println!("----------------------------------------------------------");
        }
        if want("rows") {
            println!("ROW BUFFER");
            println!("  row_hits               {}", self.row_hits);
            println!("  row_misses             {}", self.row_misses);
            println!("  row_conflicts          {}", self.row_conflicts);
            println!("  hit_rate               {:.2}%", self.row_hit_rate() * 100.0);
            println!("----------------------------------------------------------");
        }
        if want("defense") {
            println!("DEFENSE");
            println!("  useless_activates      {}", self.useless_activates);
            println!("  preventive_activates   {}", self.preventive_activates);
            println!("  preventive_dropped     {}", self.preventive_dropped);
            println!("  trr_refreshes          {}", self.trr_refreshes);
            println!("----------------------------------------------------------");
        }
        if want("cores") && !self.cores.is_empty() {
            println!("PER CORE");
            for (id, core) in self.cores.iter().enumerate() {
                let latency = if core.reads_served == 0 {
                    0.0
                } else {
                    core.read_latency_sum as f64 / core.reads_served as f64
                };
                println!(
                    "  core{id:<3} rd h/m/c {}/{}/{}  wr h/m/c {}/{}/{}  avg_lat {:.2}",
                    core.read_row_hits,
                    core.read_row_misses,
                    core.read_row_conflicts,
                    core.write_row_hits,
                    core.write_row_misses,
                    core.write_row_conflicts,
                    latency
                );
            }
            println!("==========================================================");
        }
    }

    /// Prints every section.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
