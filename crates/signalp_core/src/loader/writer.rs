//! Chunked write of a reconciled plan inside the caller's transaction.

use crate::loader::reconcile::WritePlan;
use crate::loader::LoadContext;
use crate::repo::genome_repo::RepoResult;
use crate::repo::BulkWriter;
use log::debug;

/// Writes all updates, then all creates, `ctx.batch_size` records at a time.
///
/// Created records receive their storage ids. The first failing chunk stops
/// the write; rolling back is the caller's transaction's job.
pub(crate) fn write_batched<R, W>(
    ctx: &LoadContext,
    writer: &W,
    plan: &mut WritePlan<R>,
) -> RepoResult<()>
where
    W: BulkWriter<R>,
{
    for (index, chunk) in plan.updates.chunks(ctx.batch_size).enumerate() {
        writer.update_chunk(chunk)?;
        debug!(
            "event=chunk_written module=loader status=ok loader={} run_id={} kind=update chunk={index} rows={}",
            ctx.loader,
            ctx.run_id,
            chunk.len()
        );
    }
    for (index, chunk) in plan.creates.chunks_mut(ctx.batch_size).enumerate() {
        let rows = chunk.len();
        writer.insert_chunk(chunk)?;
        debug!(
            "event=chunk_written module=loader status=ok loader={} run_id={} kind=create chunk={index} rows={rows}",
            ctx.loader,
            ctx.run_id
        );
    }
    Ok(())
}
