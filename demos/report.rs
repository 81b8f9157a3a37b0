use coordmap::{MapBox, Mapping, PointBatch, ShiftMap, ZoomMap};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let zoom: Mapping = ZoomMap::new(2, 1.3)?.into();
    let shift: Mapping = ShiftMap::new(vec![10.0, -5.0])?.into();
    let mut pixels_to_sky = zoom.then(&shift)?;
    pixels_to_sky.set_ident("pixels to sky");
    pixels_to_sky.set_report(true);

    let points = PointBatch::from_rows(&[[1.0, 3.0], [2.0, 99.0], [-6.0, -5.0], [30.0, 21.0]])?;
    let sky = pixels_to_sky.tran(&points)?;
    pixels_to_sky.tran_inverse(&sky)?;

    let simple = pixels_to_sky.simplify();
    println!("{}", pixels_to_sky.show());
    println!("{}", simple.show());

    let bounds = MapBox::new(&simple, &[0.0, 0.0], &[100.0, 50.0])?;
    println!("lower bounds: {:?}", bounds.lbnd_out);
    println!("upper bounds: {:?}", bounds.ubnd_out);
    Ok(())
}
