use bobbin_client::{PageOptions, RequestEnvelope};

use crate::cli::{BatchArgs, ListArgs, OutputFormat, RequestCommand, require_object};
use crate::client::{AppContext, CliResult};
use crate::output::{render_batch, render_page, render_value};

pub(crate) async fn handle_request(
    ctx: &AppContext,
    command: RequestCommand,
    format: OutputFormat,
) -> CliResult<()> {
    let facade = &ctx.facade;
    let value = match command {
        RequestCommand::Get(args) => {
            if let Some(params) = &args.params {
                require_object("params", params)?;
            }
            facade.get(&args.path, args.params.as_ref()).await?
        }
        RequestCommand::Delete(args) => {
            if let Some(params) = &args.params {
                require_object("params", params)?;
            }
            facade.delete(&args.path, args.params.as_ref()).await?
        }
        RequestCommand::Post(args) => facade.post(&args.path, args.body.as_ref()).await?,
        RequestCommand::Put(args) => facade.put(&args.path, args.body.as_ref()).await?,
    };
    render_value(&value, format)
}

pub(crate) async fn handle_list(
    ctx: &AppContext,
    args: ListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    require_object("params", &args.params)?;
    let options = PageOptions {
        method: args.method.into(),
        param_type: args.param_type.into(),
        data_field: args.data_field,
        total_field: args.total_field,
    };
    let page = ctx
        .facade
        .request_with_loading_and_pagination(&args.path, &args.params, &options)
        .await?;
    render_page(&page, format)
}

pub(crate) async fn handle_batch(
    ctx: &AppContext,
    args: BatchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut envelope = RequestEnvelope::new(args.entity, args.action.into());
    if let Some(id) = args.id {
        envelope = envelope.with_id(id);
    }
    if let Some(data) = args.data {
        envelope = envelope.with_data(data);
    }
    if let Some(conditions) = args.conditions {
        envelope = envelope.with_conditions(conditions);
    }
    if !args.fetch.is_empty() {
        envelope = envelope.with_fetch(args.fetch);
    }

    let response = ctx.facade.batch(&envelope).await?;
    if let Err(err) = response.clone().into_data() {
        return Err(err.into());
    }
    render_batch(&response, format)
}
